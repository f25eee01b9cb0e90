//! Unified code generation interface for gogen
//!
//! [`Codegen`] runs one pass over a directory tree: scan for annotations,
//! dispatch targets to generators, merge the files they produce and write
//! them. A fresh [`PackageResolver`] is built for every pass.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use derive_builder::Builder;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::core::{GenContext, GeneratorRegistry, OutputDefaults, write_atomic};
use crate::error::{ResolveError, TargetError};
use crate::generators::{builtin_registry, GoFile};
use crate::resolver::{find_module_root, PackageResolve, PackageResolver, ResolverConfig};
use crate::scanner::{ScanOptions, ScanResult, Scanner};

/// Result of one generator within a pass
#[derive(Debug, Clone, Serialize)]
pub struct CodegenResult {
    pub generator_name: String,
    pub files_generated: Vec<PathBuf>,
    pub success: bool,
    pub message: String,
}

/// Settings of a generation pass
#[derive(Debug, Clone, Default, Builder)]
#[builder(default)]
pub struct CodegenOptions {
    /// Descend into subdirectories
    pub recursive: bool,
    /// Scan `_test.go` files too
    pub include_tests: bool,
    /// Render everything but write nothing
    pub dry_run: bool,
    /// Output patterns from configuration
    pub defaults: OutputDefaults,
    /// Generators to leave out, by name
    pub disabled: Vec<String>,
}

/// Outcome of a whole pass
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchResult {
    pub results: Vec<CodegenResult>,
    pub errors: Vec<TargetError>,
    /// Files whose content changed on disk (or would change, in a dry run)
    pub files_written: Vec<PathBuf>,
    pub files_unchanged: usize,
    pub targets: usize,
}

impl BatchResult {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    /// Fold another pass into this one
    pub fn extend(&mut self, other: BatchResult) {
        self.results.extend(other.results);
        self.errors.extend(other.errors);
        self.files_written.extend(other.files_written);
        self.files_unchanged += other.files_unchanged;
        self.targets += other.targets;
    }
}

/// A generated file being assembled from one or more generators
struct PendingFile {
    file: GoFile,
    generators: Vec<String>,
}

/// Unified code generation runner
pub struct Codegen {
    registry: GeneratorRegistry,
    resolver_config: ResolverConfig,
    options: CodegenOptions,
}

impl Codegen {
    /// Create a runner with the built-in generators, minus the disabled ones
    pub fn new(resolver_config: ResolverConfig, options: CodegenOptions) -> Self {
        Self::with_registry(builtin_registry(), resolver_config, options)
    }

    pub fn with_registry(
        mut registry: GeneratorRegistry,
        resolver_config: ResolverConfig,
        options: CodegenOptions,
    ) -> Self {
        if !options.disabled.is_empty() {
            registry.retain(|g| !options.disabled.iter().any(|d| d == g.name()));
        }
        Self {
            registry,
            resolver_config,
            options,
        }
    }

    pub fn registry(&self) -> &GeneratorRegistry {
        &self.registry
    }

    pub fn options(&self) -> &CodegenOptions {
        &self.options
    }

    /// Scanner matching the registered annotations
    pub fn scanner(&self) -> Scanner {
        let options = ScanOptions {
            recursive: self.options.recursive,
            include_tests: self.options.include_tests,
        };
        Scanner::new(self.registry.annotation_names(), options)
    }

    /// Resolver for a pass rooted at `root`
    pub fn resolver_for(&self, root: &Path) -> Result<PackageResolver, ResolveError> {
        let mut config = self.resolver_config.clone();
        if config.module_root.is_none() {
            let start = if root.is_file() {
                root.parent().unwrap_or(root)
            } else {
                root
            };
            config.module_root = find_module_root(start);
        }
        PackageResolver::new(config)
    }

    /// Scan `root` and generate everything found
    pub fn run(&self, root: &Path) -> Result<BatchResult, ResolveError> {
        let resolver = self.resolver_for(root)?;
        let scan = self.scanner().scan(root);
        Ok(self.generate(&resolver, scan))
    }

    /// Dispatch a finished scan and write the merged output
    pub fn generate(&self, resolver: &dyn PackageResolve, scan: ScanResult) -> BatchResult {
        let started = Instant::now();
        let mut batch = BatchResult {
            targets: scan.target_count(),
            ..Default::default()
        };
        batch.errors.extend(scan.errors.iter().cloned());

        let dispatch = self.registry.dispatch(&scan, &self.options.defaults);
        batch.errors.extend(dispatch.errors);

        let ctx = GenContext::new(resolver);
        let mut pending: BTreeMap<PathBuf, PendingFile> = BTreeMap::new();

        // batches arrive in priority order, so merging keeps lower priorities first
        for generator_batch in &dispatch.batches {
            let generator = generator_batch.generator;
            let name = generator.name().to_string();
            debug!("Running generator {} on {} targets", name, generator_batch.targets.len());

            let output = generator.generate(&ctx, &generator_batch.targets);
            let failed = output.errors.len();
            batch.errors.extend(output.errors);

            let mut files = Vec::new();
            for generated in output.files {
                files.push(generated.path.clone());
                match pending.get_mut(&generated.path) {
                    Some(existing) => {
                        if let Err(e) = existing.file.merge(generated.file) {
                            batch.errors.push(merge_error(&name, &generated.path, e.to_string()));
                            continue;
                        }
                        existing.generators.push(name.clone());
                    }
                    None => {
                        pending.insert(
                            generated.path,
                            PendingFile {
                                file: generated.file,
                                generators: vec![name.clone()],
                            },
                        );
                    }
                }
            }

            batch.results.push(CodegenResult {
                generator_name: name,
                success: failed == 0,
                message: format!(
                    "{} targets, {} files, {} errors",
                    generator_batch.targets.len(),
                    files.len(),
                    failed
                ),
                files_generated: files,
            });
        }

        for (path, pending_file) in pending {
            self.write(&path, &pending_file, &mut batch);
        }

        info!(
            "Generated {} files from {} targets in {:?} ({} unchanged, {} errors)",
            batch.files_written.len(),
            batch.targets,
            started.elapsed(),
            batch.files_unchanged,
            batch.errors.len()
        );
        batch
    }

    fn write(&self, path: &Path, pending: &PendingFile, batch: &mut BatchResult) {
        let contents = pending.file.render();
        if fs::read_to_string(path).is_ok_and(|existing| existing == contents) {
            debug!("{} is up to date", path.display());
            batch.files_unchanged += 1;
            return;
        }

        if self.options.dry_run {
            info!("Would write {} ({})", path.display(), pending.generators.join(", "));
            batch.files_written.push(path.to_path_buf());
            return;
        }

        match write_atomic(path, &contents) {
            Ok(()) => {
                debug!("Wrote {} ({})", path.display(), pending.generators.join(", "));
                batch.files_written.push(path.to_path_buf());
            }
            Err(e) => {
                warn!("Failed to write {}: {}", path.display(), e);
                let generator = pending.generators.join(",");
                batch.errors.push(merge_error(&generator, path, format!("write failed: {e}")));
            }
        }
    }
}

fn merge_error(generator: &str, path: &Path, message: String) -> TargetError {
    TargetError {
        generator: generator.to_string(),
        file: path.to_path_buf(),
        target: String::new(),
        line: 0,
        message,
    }
}
