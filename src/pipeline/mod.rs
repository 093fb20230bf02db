// src/pipeline/mod.rs

//! External two-stage analysis pipeline.
//!
//! - [`backend`] provides the `StageExecutor` trait and the production
//!   `CommandStageExecutor`, which spawns the stage programs with
//!   `tokio::process::Command`. Tests swap in a scripted executor.
//! - [`runner`] holds `PipelineRunner`, which chains tissue detection and
//!   artifact detection for one slide and reports a tagged outcome instead
//!   of raw exit codes.

use std::fmt;
use std::path::PathBuf;

pub mod backend;
pub mod runner;

pub use backend::{CommandStageExecutor, StageExecutor, StageExit};
pub use runner::PipelineRunner;

/// One of the two external analysis programs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    TissueDetection,
    ArtifactDetection,
}

impl Stage {
    pub const ALL: [Stage; 2] = [Stage::TissueDetection, Stage::ArtifactDetection];

    pub fn label(self) -> &'static str {
        match self {
            Stage::TissueDetection => "tissue detection",
            Stage::ArtifactDetection => "artifact detection",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single stage execution for one triggering slide.
///
/// Lives only as long as the stage runs; it is logged, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineInvocation {
    pub slide: PathBuf,
    pub stage: Stage,
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
}

impl PipelineInvocation {
    /// Shell-like rendering for log lines and `--dry-run`.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Why a stage did not succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageFailure {
    /// The program ran and exited with a non-zero code.
    ExitCode(i32),
    /// The program was terminated without an exit code (e.g. by a signal).
    Terminated,
    /// The program could not be started or waited on.
    Launch(String),
}

impl fmt::Display for StageFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageFailure::ExitCode(code) => write!(f, "exited with status {code}"),
            StageFailure::Terminated => f.write_str("terminated without exit status"),
            StageFailure::Launch(msg) => write!(f, "failed to launch: {msg}"),
        }
    }
}

/// Tagged result of running the pipeline for one slide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    Completed,
    Stage1Failed(StageFailure),
    Stage2Failed(StageFailure),
}

impl PipelineOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, PipelineOutcome::Completed)
    }

    fn failed_at(stage: Stage, failure: StageFailure) -> Self {
        match stage {
            Stage::TissueDetection => PipelineOutcome::Stage1Failed(failure),
            Stage::ArtifactDetection => PipelineOutcome::Stage2Failed(failure),
        }
    }
}
