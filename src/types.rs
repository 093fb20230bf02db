// src/types.rs

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Where a slide file is in its processing lifecycle.
///
/// Variants are declared in lifecycle order; a file may only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ProcessingState {
    Discovered,
    AwaitingStability,
    Stable,
    Stage1Running,
    Stage1Failed,
    Stage2Running,
    Stage2Failed,
    Completed,
}

impl ProcessingState {
    /// Terminal states end tracking for this observation of the file.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ProcessingState::Stage1Failed
                | ProcessingState::Stage2Failed
                | ProcessingState::Completed
        )
    }

    /// Whether `next` is a legal successor of `self`.
    ///
    /// Failure states only follow their own running stage, and nothing
    /// follows a terminal state.
    pub fn can_advance_to(self, next: ProcessingState) -> bool {
        use ProcessingState::*;
        matches!(
            (self, next),
            (Discovered, AwaitingStability)
                | (AwaitingStability, Stable)
                | (Stable, Stage1Running)
                | (Stage1Running, Stage1Failed)
                | (Stage1Running, Stage2Running)
                | (Stage2Running, Stage2Failed)
                | (Stage2Running, Completed)
        )
    }
}

impl fmt::Display for ProcessingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Rejected state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IllegalTransition {
    pub from: ProcessingState,
    pub to: ProcessingState,
}

impl fmt::Display for IllegalTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "illegal transition {} -> {}", self.from, self.to)
    }
}

impl std::error::Error for IllegalTransition {}

/// A slide file observed by the watcher, tracked until it reaches a terminal
/// state.
#[derive(Debug, Clone)]
pub struct WatchedFile {
    path: PathBuf,
    last_size: Option<u64>,
    first_seen: Instant,
    state: ProcessingState,
}

impl WatchedFile {
    pub fn discovered(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            last_size: None,
            first_seen: Instant::now(),
            state: ProcessingState::Discovered,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name for log lines; falls back to the full path.
    pub fn name(&self) -> String {
        display_name(&self.path)
    }

    pub fn state(&self) -> ProcessingState {
        self.state
    }

    pub fn last_size(&self) -> Option<u64> {
        self.last_size
    }

    pub fn first_seen(&self) -> Instant {
        self.first_seen
    }

    pub fn record_size(&mut self, size: u64) {
        self.last_size = Some(size);
    }

    /// Move to `next`, refusing anything but a forward lifecycle step.
    pub fn advance(&mut self, next: ProcessingState) -> Result<(), IllegalTransition> {
        if !self.state.can_advance_to(next) {
            return Err(IllegalTransition {
                from: self.state,
                to: next,
            });
        }
        tracing::debug!(file = %self.name(), from = %self.state, to = %next, "state transition");
        self.state = next;
        Ok(())
    }
}

/// Best-effort human name of a path: its file name, else the whole path.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ProcessingState::*;

    #[test]
    fn happy_path_walks_forward() {
        let mut file = WatchedFile::discovered("/slides/a.svs");
        for next in [AwaitingStability, Stable, Stage1Running, Stage2Running, Completed] {
            file.advance(next).unwrap();
        }
        assert_eq!(file.state(), Completed);
        assert!(file.state().is_terminal());
    }

    #[test]
    fn completed_cannot_reenter_earlier_state() {
        let mut file = WatchedFile::discovered("/slides/a.svs");
        for next in [AwaitingStability, Stable, Stage1Running, Stage2Running, Completed] {
            file.advance(next).unwrap();
        }
        for earlier in [Discovered, AwaitingStability, Stable, Stage1Running, Stage2Running] {
            let err = file.advance(earlier).unwrap_err();
            assert_eq!(err.from, Completed);
        }
    }

    #[test]
    fn stage2_failure_requires_stage2_running() {
        let mut file = WatchedFile::discovered("/slides/a.svs");
        file.advance(AwaitingStability).unwrap();
        file.advance(Stable).unwrap();
        file.advance(Stage1Running).unwrap();
        assert!(file.advance(Stage2Failed).is_err());
        file.advance(Stage1Failed).unwrap();
        assert!(file.advance(Stage2Running).is_err());
    }

    #[test]
    fn display_name_uses_file_name() {
        assert_eq!(display_name(Path::new("/data/in/slideA.svs")), "slideA.svs");
    }
}
