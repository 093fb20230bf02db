// src/watch/mod.rs

//! File watching and write-completion detection.
//!
//! This module is responsible for:
//! - Wiring up a non-recursive filesystem watcher (`notify`) on the input
//!   directory and translating its events into runtime events.
//! - Deciding which new files are slides (`filter`).
//! - Waiting until a slide has finished being written (`stability`).
//!
//! It does **not** know about the pipeline or the dedupe ledger.

pub mod filter;
pub mod stability;
pub mod watcher;

pub use filter::SlideFilter;
pub use stability::{Stable, StabilityGate};
pub use watcher::{classify_event, spawn_watcher, WatcherHandle};
