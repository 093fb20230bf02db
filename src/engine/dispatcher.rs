// src/engine/dispatcher.rs

//! Per-file state machine: filter → stability → claim → pipeline.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::engine::ledger::DedupeLedger;
use crate::pipeline::{PipelineOutcome, PipelineRunner, Stage};
use crate::types::{ProcessingState, WatchedFile};
use crate::watch::{SlideFilter, StabilityGate};

/// What happened to one creation event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    /// Not a slide (wrong name pattern).
    Ignored,
    /// Already claimed when the event arrived.
    AlreadyProcessed,
    /// Settled, but another event for the same path won the claim.
    Duplicate,
    /// Vanished or unreadable while waiting for it to settle.
    Unavailable,
    /// Dispatcher was closed before the pipeline could start.
    Cancelled,
    /// The pipeline ran.
    Finished(PipelineOutcome),
}

/// Drives one slide from creation event to terminal state.
///
/// Per-file errors never escape: every path ends in a `FileOutcome` and a
/// log line. Pipelines are bounded by a semaphore, held only while stages
/// run, so stability waits for other files are never blocked.
#[derive(Debug)]
pub struct WatchDispatcher {
    filter: SlideFilter,
    gate: StabilityGate,
    ledger: Arc<DedupeLedger>,
    runner: PipelineRunner,
    permits: Semaphore,
}

impl WatchDispatcher {
    pub fn new(
        filter: SlideFilter,
        gate: StabilityGate,
        ledger: Arc<DedupeLedger>,
        runner: PipelineRunner,
        max_concurrent: usize,
    ) -> Self {
        Self {
            filter,
            gate,
            ledger,
            runner,
            permits: Semaphore::new(max_concurrent.max(1)),
        }
    }

    pub fn ledger(&self) -> &Arc<DedupeLedger> {
        &self.ledger
    }

    /// Whether `path` looks like a slide we should handle.
    pub fn accepts(&self, path: &Path) -> bool {
        self.filter.matches(path)
    }

    /// Refuse to start any further pipelines.
    ///
    /// Files still waiting for a pipeline slot end as `Cancelled` with their
    /// claim released; running pipelines are unaffected.
    pub fn close(&self) {
        self.permits.close();
    }

    /// Handle one creation event for `path`.
    pub async fn handle_created(&self, path: PathBuf) -> FileOutcome {
        if !self.accepts(&path) {
            return FileOutcome::Ignored;
        }

        let mut file = WatchedFile::discovered(&path);
        let name = file.name();

        if self.ledger.is_claimed(&path) {
            info!(file = %name, "File {} was already processed. Skipping...", name);
            return FileOutcome::AlreadyProcessed;
        }

        info!(file = %name, "New slide file detected: {}", name);
        advance(&mut file, ProcessingState::AwaitingStability);

        match self.gate.await_stable(&path).await {
            Ok(stable) => file.record_size(stable.size),
            Err(err) => {
                warn!(
                    file = %name,
                    cause = %err,
                    "Error accessing file {}. File may be in use or was removed.", name
                );
                return FileOutcome::Unavailable;
            }
        }
        advance(&mut file, ProcessingState::Stable);

        let Some(claim) = Claim::take(&self.ledger, &path) else {
            info!(file = %name, "File {} is already being processed. Skipping...", name);
            return FileOutcome::Duplicate;
        };

        let Ok(_permit) = self.permits.acquire().await else {
            info!(file = %name, "Shutting down; not starting pipeline for {}", name);
            return FileOutcome::Cancelled;
        };

        let outcome = self
            .runner
            .run_observed(&path, |stage| {
                let next = match stage {
                    Stage::TissueDetection => ProcessingState::Stage1Running,
                    Stage::ArtifactDetection => ProcessingState::Stage2Running,
                };
                advance(&mut file, next);
            })
            .await;

        match &outcome {
            PipelineOutcome::Completed => {
                advance(&mut file, ProcessingState::Completed);
                claim.keep();
                info!(
                    file = %name,
                    size = file.last_size().unwrap_or_default(),
                    elapsed_ms = file.first_seen().elapsed().as_millis() as u64,
                    "Successfully processed {}", name
                );
            }
            PipelineOutcome::Stage1Failed(cause) | PipelineOutcome::Stage2Failed(cause) => {
                let state = if matches!(outcome, PipelineOutcome::Stage1Failed(_)) {
                    ProcessingState::Stage1Failed
                } else {
                    ProcessingState::Stage2Failed
                };
                advance(&mut file, state);
                // `claim` drops here, so a later creation event may retry.
                error!(
                    file = %name,
                    state = %state,
                    cause = %cause,
                    "Error processing {}: {}", name, cause
                );
            }
        }

        FileOutcome::Finished(outcome)
    }
}

fn advance(file: &mut WatchedFile, next: ProcessingState) {
    if let Err(err) = file.advance(next) {
        warn!(file = %file.name(), error = %err, "ignoring out-of-order state change");
    }
}

/// A held ledger claim, released on drop unless kept.
///
/// Covers every early exit, including the worker being aborted at shutdown.
struct Claim<'a> {
    ledger: &'a DedupeLedger,
    path: &'a Path,
    keep: bool,
}

impl<'a> Claim<'a> {
    fn take(ledger: &'a DedupeLedger, path: &'a Path) -> Option<Self> {
        // Built only after winning; a losing guard would release the winner's claim.
        if !ledger.try_claim(path) {
            return None;
        }
        Some(Self {
            ledger,
            path,
            keep: false,
        })
    }

    fn keep(mut self) {
        self.keep = true;
    }
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        if !self.keep {
            self.ledger.release(self.path);
        }
    }
}
