use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;

use crate::annotation::{Annotation, BoundParams, ParamSpec};
use crate::decl::DeclParser;
use crate::error::{GenError, TargetError};
use crate::generators::GoFile;
use crate::resolver::PackageResolve;
use crate::scanner::{Target, TargetKind};

/// Generator trait: turns a batch of annotated targets into Go files
pub trait Generator: Send + Sync {
    /// Returns the generator name used in config, logs and errors
    fn name(&self) -> &str;

    /// Annotation names this generator handles (without the `@`)
    fn annotations(&self) -> &[&'static str];

    /// Declaration kinds the annotations may be attached to
    fn target_kinds(&self) -> &[TargetKind];

    /// Ordering when several generators write the same file; lower goes first
    fn priority(&self) -> i32 {
        100
    }

    /// Parameter schema applied to every annotation instance
    fn params(&self) -> &[ParamSpec];

    /// Output pattern used when nothing else names one
    fn default_output(&self) -> &str;

    /// Generate output for all targets dispatched to this generator in one pass
    fn generate(&self, ctx: &GenContext<'_>, targets: &[AnnotatedTarget]) -> GenerateOutput;
}

/// What a generator sees of the running pass
pub struct GenContext<'a> {
    pub resolver: &'a dyn PackageResolve,
}

impl<'a> GenContext<'a> {
    pub fn new(resolver: &'a dyn PackageResolve) -> Self {
        Self { resolver }
    }

    /// Declaration parser sharing this pass's resolver
    pub fn parser(&self) -> DeclParser<'a> {
        DeclParser::new(self.resolver)
    }
}

/// One annotation instance bound to its target and output
#[derive(Debug, Clone, Serialize)]
pub struct AnnotatedTarget {
    pub target: Arc<Target>,
    pub annotation: Annotation,
    pub output: PathBuf,
    pub params: BoundParams,
}

impl AnnotatedTarget {
    /// Error for this target attributed to `generator`
    pub fn error(&self, generator: &str, err: impl Into<GenError>) -> TargetError {
        TargetError {
            generator: generator.to_string(),
            file: self.target.file_path.clone(),
            target: self.target.name.clone(),
            line: self.target.line,
            message: err.into().to_string(),
        }
    }
}

/// A rendered file destined for `path`
#[derive(Debug, Clone)]
pub struct GeneratedFile {
    pub path: PathBuf,
    pub file: GoFile,
}

/// Files and per-target failures of one generator run
#[derive(Debug, Default)]
pub struct GenerateOutput {
    pub files: Vec<GeneratedFile>,
    pub errors: Vec<TargetError>,
}

impl GenerateOutput {
    /// Merge `file` into the output for `path`, creating it if needed
    pub fn add(&mut self, path: PathBuf, file: GoFile) -> Result<(), GenError> {
        match self.files.iter_mut().find(|f| f.path == path) {
            Some(existing) => existing.file.merge(file),
            None => {
                self.files.push(GeneratedFile { path, file });
                Ok(())
            }
        }
    }
}
