use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use super::generate::GenCommand;
use super::Command;
use crate::utils::patterns::{parse_patterns, PathPattern};
use crate::utils::watcher::DevWatcher;

/// Initial generation pass followed by watch-and-regenerate
pub struct DevCommand {
    pub generate: GenCommand,
}

impl DevCommand {
    fn watched_patterns(&self) -> Result<Vec<PathPattern>> {
        parse_patterns(&self.generate.patterns)
            .into_iter()
            .map(|p| {
                let root = p
                    .root
                    .canonicalize()
                    .with_context(|| format!("Cannot watch {}", p.root.display()))?;
                Ok(PathPattern { root, ..p })
            })
            .collect()
    }
}

#[async_trait]
impl Command for DevCommand {
    async fn execute(&self) -> Result<()> {
        let patterns = self.watched_patterns()?;

        // failures in the first pass are reported but do not stop the watcher
        let written: Vec<PathBuf> = match self.generate.execute_pass().await {
            Ok(batch) => batch
                .files_written
                .into_iter()
                .map(|f| f.canonicalize().unwrap_or(f))
                .collect(),
            Err(e) => {
                warn!("Initial generation failed: {:#}", e);
                Vec::new()
            }
        };

        // each changed directory resolves against its own module
        let resolver_config = self.generate.resolver_config(None)?;
        let codegen = Arc::new(self.generate.codegen(&resolver_config, false)?);
        let debounce = Duration::from_millis(self.generate.config.debounce_ms);

        let watcher = DevWatcher::new(codegen, patterns, debounce);
        watcher.record_written(written).await;

        info!("Dev mode started (debounce {:?}); press Ctrl-C to stop", debounce);
        watcher.run().await
    }
}
