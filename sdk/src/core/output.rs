//! Output path selection and file writing

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::annotation::{Annotation, OUTPUT_PARAM};
use crate::scanner::FileConfig;

/// Placeholder replaced by the annotated file's base name
pub const FILE_PLACEHOLDER: &str = "$FILE";

/// Output patterns configured outside the source files
#[derive(Debug, Clone, Default)]
pub struct OutputDefaults {
    /// Pattern applying to every generator
    pub global: Option<String>,
    /// Pattern per generator name
    pub per_generator: HashMap<String, String>,
}

/// Pick the output pattern for one annotation instance.
///
/// Annotation `output=` wins, then a file `@Config` naming the generator, a
/// general file `@Config`, the configured pattern for the generator, the
/// global default and finally the generator's own default.
pub fn select_pattern<'a>(
    annotation: &'a Annotation,
    file_config: &'a FileConfig,
    defaults: &'a OutputDefaults,
    generator: &str,
    generator_default: &'a str,
) -> &'a str {
    annotation
        .get(OUTPUT_PARAM)
        .or_else(|| file_config.output_for(generator))
        .or_else(|| defaults.per_generator.get(generator).map(String::as_str))
        .or(defaults.global.as_deref())
        .unwrap_or(generator_default)
}

/// Expand `$FILE` and anchor relative patterns at the source file's directory
pub fn expand_pattern(pattern: &str, source_file: &Path) -> PathBuf {
    let stem = source_file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let expanded = PathBuf::from(pattern.replace(FILE_PLACEHOLDER, &stem));
    if expanded.is_absolute() {
        return expanded;
    }
    match source_file.parent() {
        Some(dir) => dir.join(expanded),
        None => expanded,
    }
}

static TEMP_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Write `contents` to a sibling temporary file, then rename it over `path`
pub fn write_atomic(path: &Path, contents: &str) -> io::Result<()> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir)?;
        }
    }

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let seq = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    let temp = path.with_file_name(format!(".{}.{}.{}.tmp", name, std::process::id(), seq));

    if let Err(e) = fs::write(&temp, contents) {
        let _ = fs::remove_file(&temp);
        return Err(e);
    }
    fs::rename(&temp, path).inspect_err(|_| {
        let _ = fs::remove_file(&temp);
    })
}
