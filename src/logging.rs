// src/logging.rs

//! Logging setup for `slidewatch` using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the log level:
//! 1. `--log-level` CLI flag (if provided)
//! 2. `SLIDEWATCH_LOG` environment variable (e.g. "info", "debug")
//! 3. default to `info`
//!
//! Every line goes to two sinks: stdout, and `slidewatch.log` inside the
//! output directory (appended, no ANSI colours). Both carry timestamps.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, registry};

use crate::cli::LogLevel;

/// File name of the watcher log inside the output directory.
pub const LOG_FILE_NAME: &str = "slidewatch.log";

pub fn log_file_path(output_dir: &Path) -> PathBuf {
    output_dir.join(LOG_FILE_NAME)
}

/// Initialise the global logging subscriber.
///
/// `output_dir` must already exist. Safe to call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>, output_dir: &Path) -> Result<()> {
    let level = resolve_level(cli_level);

    let path = log_file_path(output_dir);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("opening log file {:?}", path))?;

    let stdout_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stdout);

    let file_layer = fmt::layer()
        .with_target(false)
        .with_ansi(false)
        .with_writer(Mutex::new(file));

    registry()
        .with(LevelFilter::from_level(level))
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .context("installing tracing subscriber")?;

    Ok(())
}

/// Stdout-only subscriber for the `mask-report` tool.
pub fn init_console_logging(cli_level: Option<LogLevel>) -> Result<()> {
    registry()
        .with(LevelFilter::from_level(resolve_level(cli_level)))
        .with(fmt::layer().with_target(false).with_writer(std::io::stdout))
        .try_init()
        .context("installing tracing subscriber")?;
    Ok(())
}

fn resolve_level(cli_level: Option<LogLevel>) -> tracing::Level {
    match cli_level {
        Some(lvl) => level_from_log_level(lvl),
        None => std::env::var("SLIDEWATCH_LOG")
            .ok()
            .and_then(|s| parse_level_str(&s))
            .unwrap_or(tracing::Level::INFO),
    }
}

fn level_from_log_level(lvl: LogLevel) -> tracing::Level {
    match lvl {
        LogLevel::Error => tracing::Level::ERROR,
        LogLevel::Warn => tracing::Level::WARN,
        LogLevel::Info => tracing::Level::INFO,
        LogLevel::Debug => tracing::Level::DEBUG,
        LogLevel::Trace => tracing::Level::TRACE,
    }
}

fn parse_level_str(s: &str) -> Option<tracing::Level> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some(tracing::Level::ERROR),
        "warn" | "warning" => Some(tracing::Level::WARN),
        "info" => Some(tracing::Level::INFO),
        "debug" => Some(tracing::Level::DEBUG),
        "trace" => Some(tracing::Level::TRACE),
        _ => None,
    }
}
