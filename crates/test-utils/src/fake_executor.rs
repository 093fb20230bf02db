use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use slidewatch::pipeline::{PipelineInvocation, Stage, StageExecutor, StageExit};

/// A fake stage executor that:
/// - records every invocation
/// - returns scripted exit codes per stage (0 once the script runs out)
/// - optionally sleeps for a fixed time per stage, to keep pipelines in flight
/// - tracks the peak number of stages running at once.
#[derive(Debug, Default)]
pub struct ScriptedStageExecutor {
    exits: Mutex<HashMap<Stage, VecDeque<i32>>>,
    invocations: Mutex<Vec<PipelineInvocation>>,
    delay: Option<Duration>,
    running: AtomicUsize,
    peak: AtomicUsize,
}

impl ScriptedStageExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stage sleeps `delay` before reporting.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queue an exit code for the next call of `stage`.
    pub fn push_exit(&self, stage: Stage, code: i32) {
        self.exits
            .lock()
            .unwrap()
            .entry(stage)
            .or_default()
            .push_back(code);
    }

    pub fn invocations(&self) -> Vec<PipelineInvocation> {
        self.invocations.lock().unwrap().clone()
    }

    pub fn calls(&self, stage: Stage) -> usize {
        self.invocations
            .lock()
            .unwrap()
            .iter()
            .filter(|i| i.stage == stage)
            .count()
    }

    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

impl StageExecutor for ScriptedStageExecutor {
    fn run_stage<'a>(
        &'a self,
        invocation: &'a PipelineInvocation,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<StageExit>> + Send + 'a>> {
        Box::pin(async move {
            self.invocations.lock().unwrap().push(invocation.clone());
            let code = self
                .exits
                .lock()
                .unwrap()
                .get_mut(&invocation.stage)
                .and_then(|q| q.pop_front())
                .unwrap_or(0);

            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            self.running.fetch_sub(1, Ordering::SeqCst);
            Ok(StageExit::from_code(code))
        })
    }
}
