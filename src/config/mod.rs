// src/config/mod.rs

//! Configuration loading and validation for slidewatch.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk, or fall back to defaults (`loader.rs`).
//! - Validate invariants serde can't express (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, load_or_default};
pub use model::{ConfigFile, DispatchSection, StageConfig, WatchSection};
pub use validate::validate_config;
