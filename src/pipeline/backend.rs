// src/pipeline/backend.rs

//! Pluggable stage executor abstraction.
//!
//! The runner talks to a `StageExecutor` instead of spawning processes
//! directly. Production uses [`CommandStageExecutor`]; tests provide an
//! executor that records invocations and returns scripted exit codes.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::PipelineInvocation;

/// Lines of stderr kept per stage run for failure reports.
pub const STDERR_TAIL_LINES: usize = 20;

/// How long to keep draining stderr after the child exited. A grandchild
/// holding the pipe open must not stall the pipeline.
const STDERR_DRAIN: Duration = Duration::from_secs(2);

/// How a stage process ended.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageExit {
    /// `None` when the process was killed by a signal.
    pub code: Option<i32>,
    /// Last stderr lines, oldest first.
    pub stderr_tail: Vec<String>,
}

impl StageExit {
    pub fn from_code(code: i32) -> Self {
        Self {
            code: Some(code),
            stderr_tail: Vec::new(),
        }
    }

    pub fn terminated() -> Self {
        Self::default()
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Trait abstracting how a stage program is executed.
///
/// Implementations are shared between concurrent slide workers, hence `&self`.
pub trait StageExecutor: Send + Sync {
    /// Run the invocation to completion.
    ///
    /// `Err` means the program could not be run at all; a non-zero exit is
    /// an `Ok(StageExit)`.
    fn run_stage<'a>(
        &'a self,
        invocation: &'a PipelineInvocation,
    ) -> Pin<Box<dyn Future<Output = Result<StageExit>> + Send + 'a>>;
}

/// Real executor: spawns the stage program as a child process.
///
/// - The child inherits our environment.
/// - stdout lines are logged at `info`, stderr at `warn`, so the pipes
///   never fill up. The last [`STDERR_TAIL_LINES`] stderr lines are returned
///   in the [`StageExit`].
/// - `kill_on_drop(true)`: if the worker future is aborted during shutdown,
///   the child is killed with it.
#[derive(Debug, Clone, Default)]
pub struct CommandStageExecutor;

impl CommandStageExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl StageExecutor for CommandStageExecutor {
    fn run_stage<'a>(
        &'a self,
        invocation: &'a PipelineInvocation,
    ) -> Pin<Box<dyn Future<Output = Result<StageExit>> + Send + 'a>> {
        Box::pin(async move {
            let mut cmd = Command::new(&invocation.program);
            cmd.args(&invocation.args)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true);
            if let Some(dir) = &invocation.working_dir {
                cmd.current_dir(dir);
            }

            let mut child = cmd
                .spawn()
                .with_context(|| format!("spawning `{}`", invocation.command_line()))?;

            let stage = invocation.stage;
            if let Some(stdout) = child.stdout.take() {
                tokio::spawn(async move {
                    let mut lines = BufReader::new(stdout).lines();
                    while let Ok(Some(line)) = lines.next_line().await {
                        info!(%stage, "stdout: {}", line);
                    }
                });
            }
            let stderr_task = child.stderr.take().map(|stderr| {
                tokio::spawn(async move {
                    let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);
                    let mut lines = BufReader::new(stderr).lines();
                    while let Ok(Some(line)) = lines.next_line().await {
                        warn!(%stage, "stderr: {}", line);
                        if tail.len() == STDERR_TAIL_LINES {
                            tail.pop_front();
                        }
                        tail.push_back(line);
                    }
                    Vec::from(tail)
                })
            });

            let status = child
                .wait()
                .await
                .with_context(|| format!("waiting for `{}`", invocation.command_line()))?;

            let stderr_tail = match stderr_task {
                Some(task) => match tokio::time::timeout(STDERR_DRAIN, task).await {
                    Ok(Ok(tail)) => tail,
                    Ok(Err(err)) => {
                        debug!(%stage, error = %err, "stderr reader failed");
                        Vec::new()
                    }
                    Err(_) => {
                        debug!(%stage, "stderr still open after exit; not waiting");
                        Vec::new()
                    }
                },
                None => Vec::new(),
            };

            Ok(StageExit {
                code: status.code(),
                stderr_tail,
            })
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::pipeline::Stage;
    use std::path::PathBuf;

    fn sh(script: &str) -> PipelineInvocation {
        PipelineInvocation {
            slide: PathBuf::from("/in/a.svs"),
            stage: Stage::TissueDetection,
            program: "sh".to_string(),
            args: vec!["-c".to_string(), script.to_string()],
            working_dir: None,
        }
    }

    #[tokio::test]
    async fn reports_exit_codes() {
        let exec = CommandStageExecutor::new();
        assert!(exec.run_stage(&sh("exit 0")).await.unwrap().success());
        let exit = exec.run_stage(&sh("echo oops >&2; exit 3")).await.unwrap();
        assert_eq!(exit.code, Some(3));
        assert!(!exit.success());
    }

    #[tokio::test]
    async fn keeps_the_tail_of_stderr() {
        let exec = CommandStageExecutor::new();
        let exit = exec
            .run_stage(&sh("for i in $(seq 1 30); do echo line$i >&2; done; exit 1"))
            .await
            .unwrap();
        assert_eq!(exit.stderr_tail.len(), STDERR_TAIL_LINES);
        assert_eq!(exit.stderr_tail.first().map(String::as_str), Some("line11"));
        assert_eq!(exit.stderr_tail.last().map(String::as_str), Some("line30"));
    }

    #[tokio::test]
    async fn traceback_is_captured_on_failure() {
        let exec = CommandStageExecutor::new();
        let exit = exec
            .run_stage(&sh("echo 'Traceback (most recent call last):' >&2; echo 'ValueError: bad slide' >&2; exit 1"))
            .await
            .unwrap();
        assert_eq!(exit.code, Some(1));
        assert_eq!(
            exit.stderr_tail,
            vec!["Traceback (most recent call last):", "ValueError: bad slide"]
        );
    }

    #[tokio::test]
    async fn inherits_environment() {
        // SAFETY: test-local variable name, not read concurrently elsewhere.
        unsafe { std::env::set_var("SLIDEWATCH_STAGE_ENV_CHECK", "yes") };
        let exec = CommandStageExecutor::new();
        let exit = exec
            .run_stage(&sh("test \"$SLIDEWATCH_STAGE_ENV_CHECK\" = yes"))
            .await
            .unwrap();
        assert!(exit.success());
    }

    #[tokio::test]
    async fn missing_program_is_an_error() {
        let exec = CommandStageExecutor::new();
        let mut inv = sh("true");
        inv.program = "/definitely/not/a/program".to_string();
        assert!(exec.run_stage(&inv).await.is_err());
    }
}
