//! Third party package lookup in the Go module cache

use std::path::{Path, PathBuf};

use tracing::debug;

/// Escape a module path the way the module cache stores it on disk:
/// every uppercase letter becomes `!` followed by its lowercase form.
pub fn escape_module_path(path: &str) -> String {
    let mut escaped = String::with_capacity(path.len());
    for ch in path.chars() {
        if ch.is_ascii_uppercase() {
            escaped.push('!');
            escaped.push(ch.to_ascii_lowercase());
        } else {
            escaped.push(ch);
        }
    }
    escaped
}

/// Find the on-disk directory of a third party import path.
///
/// The import path is shortened from the right; each prefix is tried as a
/// module root (`<cache>/<escaped prefix>@*`). The lexicographically last
/// version directory is taken and the remaining subpath must exist in it.
pub fn find_in_module_cache(cache: &Path, import_path: &str) -> Option<PathBuf> {
    let segments: Vec<&str> = import_path.split('/').filter(|s| !s.is_empty()).collect();

    for split in (1..=segments.len()).rev() {
        let module = segments[..split].join("/");
        let rest = &segments[split..];

        let base = cache.join(escape_module_path(&module));
        let pattern = format!("{}@*", glob::Pattern::escape(&base.to_string_lossy()));

        let Ok(paths) = glob::glob(&pattern) else {
            continue;
        };
        let mut versions: Vec<PathBuf> = paths.filter_map(Result::ok).filter(|p| p.is_dir()).collect();
        versions.sort();

        let Some(latest) = versions.pop() else {
            continue;
        };
        let candidate = rest.iter().fold(latest, |dir, seg| dir.join(seg));
        if candidate.is_dir() {
            debug!("Resolved {} in module cache at {}", import_path, candidate.display());
            return Some(candidate);
        }
    }

    None
}
