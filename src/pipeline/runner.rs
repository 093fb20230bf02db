// src/pipeline/runner.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{error, info};

use crate::config::StageConfig;
use crate::types::display_name;

use super::{PipelineInvocation, PipelineOutcome, Stage, StageExecutor, StageFailure};

/// Runs tissue detection then artifact detection for one slide.
///
/// Stage 2 only starts after stage 1 exited with status 0. The runner looks
/// at exit status only; whatever the stages write into the output directory
/// is their business.
///
/// With the default arguments both stages scan the whole input directory,
/// so one run may also (re)process slides other than the trigger.
#[derive(Clone)]
pub struct PipelineRunner {
    executor: Arc<dyn StageExecutor>,
    tissue_detection: StageConfig,
    artifact_detection: StageConfig,
    input_dir: PathBuf,
    output_dir: PathBuf,
}

impl std::fmt::Debug for PipelineRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineRunner")
            .field("tissue_detection", &self.tissue_detection)
            .field("artifact_detection", &self.artifact_detection)
            .field("input_dir", &self.input_dir)
            .field("output_dir", &self.output_dir)
            .finish_non_exhaustive()
    }
}

impl PipelineRunner {
    pub fn new(
        executor: Arc<dyn StageExecutor>,
        tissue_detection: StageConfig,
        artifact_detection: StageConfig,
        input_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            executor,
            tissue_detection,
            artifact_detection,
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
        }
    }

    fn stage_config(&self, stage: Stage) -> &StageConfig {
        match stage {
            Stage::TissueDetection => &self.tissue_detection,
            Stage::ArtifactDetection => &self.artifact_detection,
        }
    }

    /// Build the concrete invocation of `stage` triggered by `slide`.
    pub fn invocation(&self, stage: Stage, slide: &Path) -> PipelineInvocation {
        let cfg = self.stage_config(stage);
        let input_dir = self.input_dir.to_string_lossy();
        let output_dir = self.output_dir.to_string_lossy();
        let slide_path = slide.to_string_lossy();
        let slide_name = display_name(slide);

        let values = [
            ("{input_dir}", &*input_dir),
            ("{output_dir}", &*output_dir),
            ("{slide}", &*slide_path),
            ("{slide_name}", slide_name.as_str()),
        ];
        let args = cfg.args.iter().map(|arg| substitute(arg, &values)).collect();

        PipelineInvocation {
            slide: slide.to_path_buf(),
            stage,
            program: cfg.program.clone(),
            args,
            working_dir: cfg.working_dir.as_ref().map(PathBuf::from),
        }
    }

    /// Run both stages for `slide`.
    pub async fn run(&self, slide: &Path) -> PipelineOutcome {
        self.run_observed(slide, |_| {}).await
    }

    /// Like [`run`](Self::run), calling `on_stage_start` right before each
    /// stage is launched.
    pub async fn run_observed(
        &self,
        slide: &Path,
        mut on_stage_start: impl FnMut(Stage) + Send,
    ) -> PipelineOutcome {
        for stage in Stage::ALL {
            on_stage_start(stage);
            if let Err(failure) = self.run_stage(stage, slide).await {
                return PipelineOutcome::failed_at(stage, failure);
            }
        }
        PipelineOutcome::Completed
    }

    async fn run_stage(&self, stage: Stage, slide: &Path) -> Result<(), StageFailure> {
        let invocation = self.invocation(stage, slide);
        let file = display_name(slide);

        info!(
            file = %file,
            %stage,
            cmd = %invocation.command_line(),
            "Running {} on {}", stage, file
        );

        let result = match self.executor.run_stage(&invocation).await {
            Ok(exit) if exit.success() => Ok(()),
            Ok(exit) => {
                if !exit.stderr_tail.is_empty() {
                    error!(
                        file = %file,
                        %stage,
                        "{} stderr before failure:\n{}", stage, exit.stderr_tail.join("\n")
                    );
                }
                Err(match exit.code {
                    Some(code) => StageFailure::ExitCode(code),
                    None => StageFailure::Terminated,
                })
            }
            Err(err) => Err(StageFailure::Launch(format!("{err:#}"))),
        };

        match &result {
            Ok(()) => info!(file = %file, %stage, exit_code = 0, "{} finished", stage),
            Err(failure) => error!(
                file = %file,
                %stage,
                cause = %failure,
                "{} failed for {}: {}", stage, file, failure
            ),
        }

        result
    }
}

/// Replace placeholders in one left-to-right pass, so substituted values are
/// never scanned again.
fn substitute(arg: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(arg.len());
    let mut rest = arg;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start..];
        match values.iter().find(|(key, _)| after.starts_with(key)) {
            Some((key, value)) => {
                out.push_str(value);
                rest = &after[key.len()..];
            }
            None => {
                out.push('{');
                rest = &after[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
