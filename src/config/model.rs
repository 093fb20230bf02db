// src/config/model.rs

use serde::Deserialize;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [watch]
/// patterns = ["*.svs"]
/// poll_interval_ms = 1000
///
/// [dispatch]
/// max_concurrent = 1
/// grace_period_secs = 30
///
/// [tissue_detection]
/// program = "python"
/// args = ["wsi_tis_detect.py", "--slide_folder", "{input_dir}", "--output_dir", "{output_dir}"]
/// ```
///
/// All sections are optional and have defaults matching the GrandQC scripts.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub watch: WatchSection,

    #[serde(default)]
    pub dispatch: DispatchSection,

    /// Stage 1.
    #[serde(default = "StageConfig::tissue_detection")]
    pub tissue_detection: StageConfig,

    /// Stage 2, only run after stage 1 succeeded.
    #[serde(default = "StageConfig::artifact_detection")]
    pub artifact_detection: StageConfig,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            watch: WatchSection::default(),
            dispatch: DispatchSection::default(),
            tissue_detection: StageConfig::tissue_detection(),
            artifact_detection: StageConfig::artifact_detection(),
        }
    }
}

/// `[watch]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WatchSection {
    /// Case-insensitive globs matched against the file name of new files.
    #[serde(default = "default_patterns")]
    pub patterns: Vec<String>,

    /// Interval between two size readings while waiting for a file to settle.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Number of consecutive equal size readings that mark a file as stable.
    ///
    /// Defaults to 2, so a copy that pauses for one poll interval counts as
    /// finished.
    #[serde(default = "default_stable_reads")]
    pub stable_reads: usize,
}

fn default_patterns() -> Vec<String> {
    vec!["*.svs".to_string()]
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_stable_reads() -> usize {
    2
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            patterns: default_patterns(),
            poll_interval_ms: default_poll_interval_ms(),
            stable_reads: default_stable_reads(),
        }
    }
}

/// `[dispatch]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DispatchSection {
    /// Upper bound on pipelines running at the same time.
    ///
    /// The stages scan the whole input directory, so the default keeps
    /// pipeline runs sequential.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// How long shutdown waits for in-flight pipelines before killing them.
    #[serde(default = "default_grace_period_secs")]
    pub grace_period_secs: u64,
}

fn default_max_concurrent() -> usize {
    1
}

fn default_grace_period_secs() -> u64 {
    30
}

impl Default for DispatchSection {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            grace_period_secs: default_grace_period_secs(),
        }
    }
}

/// One external stage program.
///
/// `args` may contain the placeholders listed in [`PLACEHOLDERS`]; they are
/// substituted per invocation.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct StageConfig {
    pub program: String,

    #[serde(default)]
    pub args: Vec<String>,

    /// Working directory for the child; inherits ours when unset.
    #[serde(default)]
    pub working_dir: Option<String>,
}

/// Placeholders accepted inside `StageConfig::args`.
pub const PLACEHOLDERS: &[&str] = &["{input_dir}", "{output_dir}", "{slide}", "{slide_name}"];

impl StageConfig {
    pub fn tissue_detection() -> Self {
        Self::python_script("wsi_tis_detect.py")
    }

    pub fn artifact_detection() -> Self {
        Self::python_script("main.py")
    }

    fn python_script(script: &str) -> Self {
        Self {
            program: "python".to_string(),
            args: vec![
                script.to_string(),
                "--slide_folder".to_string(),
                "{input_dir}".to_string(),
                "--output_dir".to_string(),
                "{output_dir}".to_string(),
            ],
            working_dir: None,
        }
    }
}
