// src/errors.rs

//! Crate-wide error aliases and helpers.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SlideWatchError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Input directory {} does not exist!", .0.display())]
    InputDirMissing(PathBuf),

    /// The file vanished or became unreadable while waiting for it to settle.
    #[error("File unavailable: {}: {reason}", .path.display())]
    FileUnavailable { path: PathBuf, reason: String },

    /// The watched directory itself can no longer be observed.
    #[error("Watch source failure: {0}")]
    WatchSourceFailure(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Watcher error: {0}")]
    NotifyError(#[from] notify::Error),

    #[error("Image error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, SlideWatchError>;
