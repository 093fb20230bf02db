// src/engine/runtime.rs

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, warn};

use crate::errors::{Result, SlideWatchError};
use crate::pipeline::PipelineOutcome;
use crate::watch::WatcherHandle;

use super::dispatcher::{FileOutcome, WatchDispatcher};
use super::{RuntimeEvent, RuntimeOptions};

/// Tally of per-file outcomes over one watcher run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub completed: usize,
    pub failed: usize,
    /// Non-slides, already-processed files and lost claim races.
    pub skipped: usize,
    pub unavailable: usize,
    /// Cancelled or aborted during shutdown.
    pub abandoned: usize,
}

impl RunSummary {
    fn record(&mut self, joined: std::result::Result<FileOutcome, JoinError>) {
        match joined {
            Ok(FileOutcome::Finished(PipelineOutcome::Completed)) => self.completed += 1,
            Ok(FileOutcome::Finished(_)) => self.failed += 1,
            Ok(FileOutcome::Unavailable) => self.unavailable += 1,
            Ok(FileOutcome::Ignored | FileOutcome::AlreadyProcessed | FileOutcome::Duplicate) => {
                self.skipped += 1
            }
            Ok(FileOutcome::Cancelled) => self.abandoned += 1,
            Err(err) if err.is_cancelled() => self.abandoned += 1,
            Err(err) => {
                error!(error = %err, "file worker panicked");
                self.failed += 1;
            }
        }
    }
}

/// The supervisor loop.
///
/// Consumes `RuntimeEvent`s, spawns one worker per slide creation event into
/// a `JoinSet`, and on shutdown stops the watcher, refuses new work, and
/// waits for in-flight workers up to the grace period before aborting them.
pub struct Runtime {
    dispatcher: Arc<WatchDispatcher>,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    options: RuntimeOptions,
    watcher: Option<WatcherHandle>,
    workers: JoinSet<FileOutcome>,
    summary: RunSummary,
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("options", &self.options)
            .field("in_flight", &self.workers.len())
            .field("summary", &self.summary)
            .finish_non_exhaustive()
    }
}

impl Runtime {
    pub fn new(
        dispatcher: Arc<WatchDispatcher>,
        event_rx: mpsc::Receiver<RuntimeEvent>,
        options: RuntimeOptions,
    ) -> Self {
        Self {
            dispatcher,
            event_rx,
            options,
            watcher: None,
            workers: JoinSet::new(),
            summary: RunSummary::default(),
        }
    }

    /// Keep `watcher` alive for the run; it is dropped as soon as shutdown
    /// starts so no further events are produced.
    pub fn with_watcher(mut self, watcher: WatcherHandle) -> Self {
        self.watcher = Some(watcher);
        self
    }

    /// Main event loop.
    ///
    /// Returns `Err(WatchSourceFailure)` if the watched directory became
    /// unobservable; per-file failures never end the loop.
    pub async fn run(mut self) -> Result<RunSummary> {
        info!("slidewatch runtime started");

        let exit: Result<()> = loop {
            tokio::select! {
                Some(joined) = self.workers.join_next(), if !self.workers.is_empty() => {
                    self.summary.record(joined);
                }
                event = self.event_rx.recv() => {
                    debug!(?event, "runtime received event");
                    match event {
                        Some(RuntimeEvent::FileCreated { path }) => self.dispatch(path),
                        Some(RuntimeEvent::WatchFailed { reason }) => {
                            error!(%reason, "watch source failed; shutting down");
                            break Err(SlideWatchError::WatchSourceFailure(reason));
                        }
                        Some(RuntimeEvent::ShutdownRequested) => {
                            info!("shutdown requested");
                            break Ok(());
                        }
                        None => {
                            info!("runtime event channel closed; exiting");
                            break Ok(());
                        }
                    }
                }
            }
        };

        self.shutdown().await;

        let s = self.summary;
        info!(
            completed = s.completed,
            failed = s.failed,
            skipped = s.skipped,
            unavailable = s.unavailable,
            abandoned = s.abandoned,
            "runtime exiting"
        );

        exit.map(|()| s)
    }

    fn dispatch(&mut self, path: PathBuf) {
        if !self.dispatcher.accepts(&path) {
            debug!(?path, "ignoring non-slide file");
            return;
        }
        let dispatcher = Arc::clone(&self.dispatcher);
        self.workers
            .spawn(async move { dispatcher.handle_created(path).await });
    }

    async fn shutdown(&mut self) {
        if self.watcher.take().is_some() {
            info!("file watcher stopped");
        }
        self.event_rx.close();
        self.dispatcher.close();

        if self.workers.is_empty() {
            return;
        }

        let grace = self.options.grace_period;
        info!(
            in_flight = self.workers.len(),
            grace_secs = grace.as_secs_f64(),
            "waiting for in-flight files to finish"
        );

        let workers = &mut self.workers;
        let summary = &mut self.summary;
        let drained = tokio::time::timeout(grace, async {
            while let Some(joined) = workers.join_next().await {
                summary.record(joined);
            }
        })
        .await;

        if drained.is_err() {
            warn!(
                remaining = self.workers.len(),
                "grace period elapsed; terminating in-flight pipelines"
            );
            self.workers.abort_all();
            while let Some(joined) = self.workers.join_next().await {
                self.summary.record(joined);
            }
        }
    }
}
