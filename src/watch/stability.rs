// src/watch/stability.rs

//! Write-completion detection.
//!
//! Slides are usually copied in incrementally; starting a stage on a partial
//! file gives garbage downstream. The gate polls the file size at a fixed
//! interval and declares the file stable once `stable_reads` consecutive
//! readings agree. There is no upper bound on the number of polls; callers
//! that want a deadline wrap the call in `tokio::time::timeout`.
//!
//! The default of two readings accepts a pause in the copy as completion: a
//! writer that stalls for one interval is seen as done. Slow network copies
//! should raise `watch.stable_reads`.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::errors::{Result, SlideWatchError};
use crate::fs::FileSystem;

/// Result of a successful stability wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stable {
    /// The settled size in bytes.
    pub size: u64,
    /// Total number of size readings taken.
    pub reads: usize,
}

#[derive(Debug, Clone)]
pub struct StabilityGate {
    fs: Arc<dyn FileSystem>,
    interval: Duration,
    stable_reads: usize,
}

impl StabilityGate {
    /// `stable_reads` below 2 is clamped to 2: one reading alone proves nothing.
    pub fn new(fs: Arc<dyn FileSystem>, interval: Duration, stable_reads: usize) -> Self {
        Self {
            fs,
            interval,
            stable_reads: stable_reads.max(2),
        }
    }

    /// Wait until the size of `path` stops changing.
    ///
    /// Returns [`SlideWatchError::FileUnavailable`] as soon as a reading
    /// fails (file removed, permissions changed, replaced by a directory).
    pub async fn await_stable(&self, path: &Path) -> Result<Stable> {
        let mut last: Option<u64> = None;
        let mut streak = 0usize;
        let mut reads = 0usize;

        loop {
            let size = self.fs.file_size(path).map_err(|e| SlideWatchError::FileUnavailable {
                path: path.to_path_buf(),
                reason: format!("{e:#}"),
            })?;
            reads += 1;

            streak = if last == Some(size) { streak + 1 } else { 1 };
            debug!(?path, size, streak, "stability poll");

            if streak >= self.stable_reads {
                return Ok(Stable { size, reads });
            }

            last = Some(size);
            tokio::time::sleep(self.interval).await;
        }
    }
}
