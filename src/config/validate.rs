// src/config/validate.rs

use globset::GlobBuilder;

use crate::config::model::{ConfigFile, PLACEHOLDERS, StageConfig};
use crate::errors::{Result, SlideWatchError};

/// Check invariants that serde defaults cannot express.
pub fn validate_config(cfg: &ConfigFile) -> Result<()> {
    validate_watch(cfg)?;
    validate_dispatch(cfg)?;
    validate_stage("tissue_detection", &cfg.tissue_detection)?;
    validate_stage("artifact_detection", &cfg.artifact_detection)?;
    Ok(())
}

fn validate_watch(cfg: &ConfigFile) -> Result<()> {
    if cfg.watch.patterns.is_empty() {
        return Err(SlideWatchError::ConfigError(
            "[watch].patterns must contain at least one glob".to_string(),
        ));
    }

    for pattern in &cfg.watch.patterns {
        GlobBuilder::new(pattern).build().map_err(|e| {
            SlideWatchError::ConfigError(format!(
                "[watch].patterns contains invalid glob '{pattern}': {e}"
            ))
        })?;
    }

    if cfg.watch.poll_interval_ms == 0 {
        return Err(SlideWatchError::ConfigError(
            "[watch].poll_interval_ms must be >= 1 (got 0)".to_string(),
        ));
    }

    if cfg.watch.stable_reads < 2 {
        return Err(SlideWatchError::ConfigError(format!(
            "[watch].stable_reads must be >= 2 (got {})",
            cfg.watch.stable_reads
        )));
    }

    Ok(())
}

fn validate_dispatch(cfg: &ConfigFile) -> Result<()> {
    if cfg.dispatch.max_concurrent == 0 {
        return Err(SlideWatchError::ConfigError(
            "[dispatch].max_concurrent must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_stage(section: &str, stage: &StageConfig) -> Result<()> {
    if stage.program.trim().is_empty() {
        return Err(SlideWatchError::ConfigError(format!(
            "[{section}].program must not be empty"
        )));
    }

    for arg in &stage.args {
        if let Some(bad) = unknown_placeholder(arg) {
            return Err(SlideWatchError::ConfigError(format!(
                "[{section}].args uses unknown placeholder '{bad}' (known: {})",
                PLACEHOLDERS.join(", ")
            )));
        }
    }

    Ok(())
}

/// Return the first `{...}` token in `arg` that isn't a known placeholder.
fn unknown_placeholder(arg: &str) -> Option<&str> {
    let mut rest = arg;
    while let Some(start) = rest.find('{') {
        let after = &rest[start..];
        let end = after.find('}')?;
        let token = &after[..=end];
        if !PLACEHOLDERS.contains(&token) {
            return Some(token);
        }
        rest = &after[end + 1..];
    }
    None
}
