//! Dev mode: regenerate a directory once its Go files stop changing

use anyhow::{Context, Result};
use gogen_sdk::Codegen;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::patterns::PathPattern;

/// Per-directory timers; scheduling a directory again restarts its timer
pub struct Debouncer {
    delay: Duration,
    timers: HashMap<PathBuf, JoinHandle<()>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            timers: HashMap::new(),
        }
    }

    /// Run `task` for `dir` after the quiet period, replacing any pending run.
    /// A run that has already started is left to finish.
    pub fn schedule<F, Fut>(&mut self, dir: PathBuf, task: F)
    where
        F: FnOnce(PathBuf) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.timers.retain(|_, timer| !timer.is_finished());
        if let Some(previous) = self.timers.remove(&dir) {
            previous.abort();
        }

        let delay = self.delay;
        let key = dir.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // once fired, the run is detached from the timer
            tokio::spawn(task(dir));
        });
        self.timers.insert(key, timer);
    }

    /// Timers not yet fired
    pub fn pending(&self) -> usize {
        self.timers.values().filter(|t| !t.is_finished()).count()
    }

    pub fn cancel_all(&mut self) {
        for (dir, timer) in self.timers.drain() {
            debug!("Cancelling pending regeneration of {}", dir.display());
            timer.abort();
        }
    }
}

/// How long after a write change events for that file count as gogen's own
pub const ECHO_WINDOW: Duration = Duration::from_secs(2);

/// Files gogen wrote recently
#[derive(Debug)]
pub struct EchoFilter {
    window: Duration,
    written: HashMap<PathBuf, Instant>,
}

impl EchoFilter {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            written: HashMap::new(),
        }
    }

    pub fn record<I: IntoIterator<Item = PathBuf>>(&mut self, files: I, at: Instant) {
        self.written.extend(files.into_iter().map(|f| (f, at)));
    }

    pub fn is_echo(&self, path: &Path, now: Instant) -> bool {
        self.written
            .get(path)
            .is_some_and(|at| now.saturating_duration_since(*at) <= self.window)
    }

    /// Forget writes older than the window
    pub fn prune(&mut self, now: Instant) {
        let window = self.window;
        self.written.retain(|_, at| now.saturating_duration_since(*at) <= window);
    }

    pub fn len(&self) -> usize {
        self.written.len()
    }

    pub fn is_empty(&self) -> bool {
        self.written.is_empty()
    }
}

/// Directories whose Go sources changed in `event`, skipping gogen's own writes
pub fn affected_dirs(event: &Event, echoes: &EchoFilter, now: Instant) -> Vec<PathBuf> {
    if !matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    ) {
        return Vec::new();
    }

    let mut dirs = Vec::new();
    for path in &event.paths {
        let is_source = path.extension().is_some_and(|ext| ext == "go")
            && !path
                .file_name()
                .is_some_and(|name| name.to_string_lossy().starts_with('.'));
        if !is_source || echoes.is_echo(path, now) {
            continue;
        }
        if let Some(dir) = path.parent() {
            let dir = dir.to_path_buf();
            if !dirs.contains(&dir) {
                dirs.push(dir);
            }
        }
    }
    dirs
}

/// Watches the given patterns and regenerates changed directories
pub struct DevWatcher {
    codegen: Arc<Codegen>,
    patterns: Vec<PathPattern>,
    debounce: Duration,
    echoes: Arc<Mutex<EchoFilter>>,
}

impl DevWatcher {
    /// `codegen` should scan non-recursively: it is run per changed directory
    pub fn new(codegen: Arc<Codegen>, patterns: Vec<PathPattern>, debounce: Duration) -> Self {
        Self {
            codegen,
            patterns,
            debounce,
            echoes: Arc::new(Mutex::new(EchoFilter::new(ECHO_WINDOW))),
        }
    }

    /// Remember files written outside the watch loop (e.g. the initial pass)
    pub async fn record_written<I: IntoIterator<Item = PathBuf>>(&self, files: I) {
        self.echoes.lock().await.record(files, Instant::now());
    }

    /// Watch until Ctrl-C
    pub async fn run(&self) -> Result<()> {
        let (tx, mut rx) = mpsc::unbounded_channel::<Event>();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    let _ = tx.send(event);
                }
                Err(e) => warn!("Watch error: {}", e),
            },
            Config::default(),
        )
        .context("Failed to create file watcher")?;

        for pattern in &self.patterns {
            let mode = if pattern.recursive {
                RecursiveMode::Recursive
            } else {
                RecursiveMode::NonRecursive
            };
            watcher
                .watch(&pattern.root, mode)
                .with_context(|| format!("Failed to watch {}", pattern.root.display()))?;
            info!("Watching {}{}", pattern.root.display(), if pattern.recursive { "/..." } else { "" });
        }

        let mut debouncer = Debouncer::new(self.debounce);
        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Stopping dev mode ({} pending)", debouncer.pending());
                    debouncer.cancel_all();
                    break;
                }
                event = rx.recv() => {
                    let Some(event) = event else { break };
                    let dirs = {
                        let now = Instant::now();
                        let mut echoes = self.echoes.lock().await;
                        echoes.prune(now);
                        affected_dirs(&event, &echoes, now)
                    };
                    for dir in dirs {
                        debug!("Change in {}", dir.display());
                        let codegen = Arc::clone(&self.codegen);
                        let echoes = Arc::clone(&self.echoes);
                        debouncer.schedule(dir, move |dir| regenerate(codegen, echoes, dir));
                    }
                }
            }
        }

        drop(watcher);
        Ok(())
    }
}

async fn regenerate(codegen: Arc<Codegen>, echoes: Arc<Mutex<EchoFilter>>, dir: PathBuf) {
    let job_dir = dir.clone();
    let outcome = tokio::task::spawn_blocking(move || codegen.run(&job_dir)).await;

    match outcome {
        Ok(Ok(batch)) => {
            for err in &batch.errors {
                warn!("{}", err);
            }
            info!(
                "Regenerated {}: {} written, {} unchanged, {} errors",
                dir.display(),
                batch.files_written.len(),
                batch.files_unchanged,
                batch.errors.len()
            );
            echoes.lock().await.record(batch.files_written, Instant::now());
        }
        Ok(Err(e)) => error!("Generation for {} failed: {}", dir.display(), e),
        Err(e) => error!("Generation task for {} did not finish: {}", dir.display(), e),
    }
}
