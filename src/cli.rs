// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `slidewatch`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "slidewatch",
    version,
    about = "Watch a directory for new whole-slide images and run the QC pipeline on each.",
    long_about = None
)]
pub struct CliArgs {
    /// Directory to watch for new slide files (not recursive).
    #[arg(value_name = "INPUT_DIR")]
    pub input_dir: PathBuf,

    /// Directory receiving pipeline outputs and the watcher log.
    #[arg(value_name = "OUTPUT_DIR")]
    pub output_dir: PathBuf,

    /// Optional TOML config file with stage commands and tuning.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Override `watch.poll_interval_ms`.
    #[arg(long, value_name = "MS")]
    pub poll_interval_ms: Option<u64>,

    /// Override `dispatch.grace_period_secs`.
    #[arg(long, value_name = "SECS")]
    pub grace_period_secs: Option<u64>,

    /// Override `dispatch.max_concurrent`.
    #[arg(long, value_name = "N")]
    pub max_concurrent: Option<usize>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `SLIDEWATCH_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Resolve config, print the stage command lines, but don't watch.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
