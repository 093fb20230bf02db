// src/engine/mod.rs

//! Orchestration engine for slidewatch.
//!
//! This module ties together:
//! - the dedupe ledger (which slides this watcher has claimed)
//! - the per-file dispatcher (stability wait, claim, pipeline run)
//! - the supervisor runtime loop that reacts to:
//!   - file creation events
//!   - watch-source failures
//!   - shutdown signals

use std::path::PathBuf;
use std::time::Duration;

/// Events flowing into the runtime from the watcher and signal handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeEvent {
    /// A new file appeared in the input directory.
    FileCreated { path: PathBuf },
    /// The watched directory can no longer be observed.
    WatchFailed { reason: String },
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

/// Runtime options for the supervisor loop.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeOptions {
    /// How long shutdown waits for in-flight pipelines before aborting them.
    pub grace_period: Duration,
}

pub mod dispatcher;
pub mod ledger;
pub mod runtime;

pub use dispatcher::{FileOutcome, WatchDispatcher};
pub use ledger::DedupeLedger;
pub use runtime::{RunSummary, Runtime};
