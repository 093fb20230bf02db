#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use slidewatch::cli::CliArgs;
use slidewatch::config::{ConfigFile, StageConfig};
use slidewatch::fs::FileSystem;
use slidewatch::Supervisor;

/// Builder for `ConfigFile` with test-friendly defaults (1ms polling).
pub struct ConfigBuilder {
    config: ConfigFile,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        let mut config = ConfigFile::default();
        config.watch.poll_interval_ms = 1;
        config.dispatch.grace_period_secs = 5;
        Self { config }
    }

    pub fn pattern(mut self, pattern: &str) -> Self {
        self.config.watch.patterns.push(pattern.to_string());
        self
    }

    pub fn stable_reads(mut self, n: usize) -> Self {
        self.config.watch.stable_reads = n;
        self
    }

    pub fn max_concurrent(mut self, n: usize) -> Self {
        self.config.dispatch.max_concurrent = n;
        self
    }

    pub fn grace_period_secs(mut self, secs: u64) -> Self {
        self.config.dispatch.grace_period_secs = secs;
        self
    }

    pub fn stages(mut self, tissue: StageConfig, artifact: StageConfig) -> Self {
        self.config.tissue_detection = tissue;
        self.config.artifact_detection = artifact;
        self
    }

    pub fn build(self) -> ConfigFile {
        slidewatch::config::validate_config(&self.config)
            .expect("Failed to build valid config from builder");
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A supervisor over `fs` with the given config, for `/in` → `/out` style
/// directory pairs.
pub fn supervisor_for(
    cfg: ConfigFile,
    fs: Arc<dyn FileSystem>,
    input_dir: &str,
    output_dir: &str,
) -> Supervisor {
    Supervisor::from_parts(cfg, PathBuf::from(input_dir), PathBuf::from(output_dir), fs)
}

/// CLI arguments as if the user typed `slidewatch <input> <output>`.
pub fn cli_args(input_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> CliArgs {
    CliArgs {
        input_dir: input_dir.into(),
        output_dir: output_dir.into(),
        config: None,
        poll_interval_ms: None,
        grace_period_secs: None,
        max_concurrent: None,
        log_level: None,
        dry_run: false,
    }
}
