use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use futures::future::join_all;
use gogen_sdk::{find_module_root, BatchResult, Codegen, CodegenOptionsBuilder, PackageResolver, ResolverConfig};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

use super::Command;
use crate::utils::config::GogenConfig;
use crate::utils::go_env::GoEnv;
use crate::utils::patterns::{parse_patterns, PathPattern};

pub struct GenCommand {
    pub patterns: Vec<String>,
    /// Global default output pattern from `-o`
    pub output: Option<String>,
    pub quiet: bool,
    pub async_mode: bool,
    pub dry_run: bool,
    pub json: bool,
    pub config: GogenConfig,
}

impl GenCommand {
    /// Resolver locations; without a module root every pass finds its own go.mod
    pub fn resolver_config(&self, module_root: Option<PathBuf>) -> Result<ResolverConfig> {
        let go = GoEnv::detect(&self.config)?;
        Ok(ResolverConfig {
            goroot: go.goroot,
            modcache: go.gomodcache,
            module_root,
        })
    }

    /// Runner for one pattern; `recursive` comes from the pattern
    pub fn codegen(&self, resolver_config: &ResolverConfig, recursive: bool) -> Result<Codegen> {
        let mut defaults = self.config.output_defaults();
        if let Some(output) = &self.output {
            defaults.global = Some(output.clone());
        }
        let options = CodegenOptionsBuilder::default()
            .recursive(recursive)
            .dry_run(self.dry_run)
            .defaults(defaults)
            .disabled(self.config.disabled_generators())
            .build()
            .context("Invalid generation options")?;
        Ok(Codegen::new(resolver_config.clone(), options))
    }

    /// Generate every pattern; patterns inside the same module share one resolver
    pub async fn run(&self) -> Result<BatchResult> {
        let cwd = std::env::current_dir().context("Failed to read current directory")?;
        let base = self.resolver_config(None)?;

        let mut resolvers: HashMap<Option<PathBuf>, Arc<PackageResolver>> = HashMap::new();
        let mut jobs = Vec::new();
        for pattern in parse_patterns(&self.patterns) {
            let pattern = pattern.absolute(&cwd);
            let module_root = find_module_root(&pattern.root);
            let resolver = match resolvers.entry(module_root.clone()) {
                Entry::Occupied(entry) => Arc::clone(entry.get()),
                Entry::Vacant(entry) => {
                    debug!("New resolver for module at {:?}", module_root);
                    let config = ResolverConfig {
                        module_root,
                        ..base.clone()
                    };
                    let resolver =
                        PackageResolver::new(config).context("Failed to initialise package resolver")?;
                    Arc::clone(entry.insert(Arc::new(resolver)))
                }
            };
            let codegen = Arc::new(self.codegen(&base, pattern.recursive)?);
            jobs.push((pattern, codegen, resolver));
        }

        let mut batch = BatchResult::default();
        if self.async_mode {
            debug!("Generating {} patterns concurrently", jobs.len());
            let handles = jobs.into_iter().map(|(pattern, codegen, resolver)| {
                tokio::task::spawn_blocking(move || run_pattern(&codegen, &resolver, &pattern))
            });
            for joined in join_all(handles).await {
                batch.extend(joined.context("Generation task failed")?);
            }
        } else {
            for (pattern, codegen, resolver) in &jobs {
                batch.extend(run_pattern(codegen, resolver, pattern));
            }
        }
        Ok(batch)
    }

    /// Run and report; per-target errors stay in the returned batch
    pub async fn execute_pass(&self) -> Result<BatchResult> {
        let batch = self.run().await?;
        self.report(&batch)?;
        Ok(batch)
    }

    fn report(&self, batch: &BatchResult) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(batch).context("Failed to serialize report")?);
            return Ok(());
        }

        for err in &batch.errors {
            eprintln!("❌ {}", err);
        }
        if self.quiet {
            return Ok(());
        }

        let verb = if self.dry_run { "Would write" } else { "Wrote" };
        for file in &batch.files_written {
            println!("{} {}", verb, file.display());
        }
        println!(
            "✅ {} targets, {} files written, {} unchanged, {} errors",
            batch.targets,
            batch.files_written.len(),
            batch.files_unchanged,
            batch.errors.len()
        );
        Ok(())
    }
}

fn run_pattern(codegen: &Codegen, resolver: &PackageResolver, pattern: &PathPattern) -> BatchResult {
    info!("Generating {}", pattern.root.display());
    let scan = codegen.scanner().scan(&pattern.root);
    codegen.generate(resolver, scan)
}

#[async_trait]
impl Command for GenCommand {
    async fn execute(&self) -> Result<()> {
        let batch = self.execute_pass().await?;

        if !batch.is_success() {
            return Err(anyhow!("Generation finished with {} errors", batch.errors.len()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn command(goroot: PathBuf, patterns: Vec<String>) -> GenCommand {
        GenCommand {
            patterns,
            output: None,
            quiet: true,
            async_mode: true,
            dry_run: false,
            json: false,
            config: GogenConfig {
                goroot: Some(goroot),
                ..Default::default()
            },
        }
    }

    #[tokio::test]
    async fn test_async_patterns_share_one_pass_report() {
        let dir = TempDir::new().unwrap();
        let goroot = dir.path().join("goroot");
        fs::create_dir_all(goroot.join("src/fmt")).unwrap();
        let app = dir.path().join("app");
        for pkg in ["a", "b"] {
            fs::create_dir_all(app.join(pkg)).unwrap();
            fs::write(
                app.join(pkg).join("model.go"),
                format!("package {pkg}\n\n// @Gsql()\ntype Item struct {{\n\tName string\n}}\n"),
            )
            .unwrap();
        }

        let patterns = vec![
            app.join("a").display().to_string(),
            format!("{}/...", app.join("b").display()),
        ];
        let batch = command(goroot, patterns).run().await.unwrap();

        assert!(batch.is_success());
        assert_eq!(batch.targets, 2);
        assert!(app.join("a/model_gsql_gen.go").exists());
        assert!(app.join("b/model_gsql_gen.go").exists());
    }

    #[tokio::test]
    async fn test_each_module_resolves_its_own_imports() {
        let dir = TempDir::new().unwrap();
        let goroot = dir.path().join("goroot");
        fs::create_dir_all(goroot.join("src/fmt")).unwrap();

        let write = |rel: &str, body: &str| {
            let path = dir.path().join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, body).unwrap();
        };
        for module in ["a", "b"] {
            write(&format!("{module}/go.mod"), &format!("module example.com/{module}\n\ngo 1.22\n"));
            write(
                &format!("{module}/internal/y/y.go"),
                "package y\n\ntype T struct {\n\tID   int64\n\tName string\n}\n",
            );
            write(
                &format!("{module}/api/x.go"),
                &format!(
                    "package api\n\nimport \"example.com/{module}/internal/y\"\n\n\
                     // go:gen: @Pick(name=TView, source=y.T, fields=[ID])\n\nvar _ y.T\n"
                ),
            );
        }

        let patterns = vec![
            format!("{}/...", dir.path().join("a").display()),
            format!("{}/...", dir.path().join("b").display()),
        ];
        let mut cmd = command(goroot, patterns);
        cmd.async_mode = false;
        let batch = cmd.run().await.unwrap();

        assert!(batch.is_success(), "{:?}", batch.errors);
        for module in ["a", "b"] {
            let out = fs::read_to_string(dir.path().join(module).join("api/x_pick_gen.go")).unwrap();
            assert!(out.contains(&format!("\"example.com/{module}/internal/y\"")));
            assert!(out.contains("func NewTViewFrom(src *y.T) *TView {"));
        }
    }

    #[test]
    fn test_cli_output_overrides_config_default() {
        let mut cmd = command(PathBuf::from("/go"), Vec::new());
        cmd.config.default_output = Some("cfg_gen.go".to_string());
        cmd.output = Some("cli_gen.go".to_string());

        let codegen = cmd.codegen(&ResolverConfig::default(), false).unwrap();
        assert_eq!(codegen.options().defaults.global.as_deref(), Some("cli_gen.go"));
        assert!(!codegen.options().recursive);
    }
}
