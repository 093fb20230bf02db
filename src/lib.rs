// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod fs;
pub mod logging;
pub mod pipeline;
pub mod report;
pub mod types;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::cli::CliArgs;
use crate::config::{load_or_default, validate_config, ConfigFile};
use crate::engine::{DedupeLedger, RunSummary, Runtime, RuntimeEvent, RuntimeOptions, WatchDispatcher};
use crate::errors::{Result, SlideWatchError};
use crate::fs::FileSystem;
use crate::pipeline::{CommandStageExecutor, PipelineRunner, Stage, StageExecutor};
use crate::watch::{SlideFilter, StabilityGate};

/// Process-level wiring: directories, config, and the run/shutdown lifecycle.
///
/// Construction via [`Supervisor::prepare`] does everything that must happen
/// before logging starts (the log file lives in the output directory).
#[derive(Debug)]
pub struct Supervisor {
    config: ConfigFile,
    input_dir: PathBuf,
    output_dir: PathBuf,
    fs: Arc<dyn FileSystem>,
}

impl Supervisor {
    /// Validate the input directory, resolve config, create the output
    /// directory.
    pub fn prepare(args: &CliArgs, fs: Arc<dyn FileSystem>) -> Result<Self> {
        let input_dir = absolute(&args.input_dir)?;
        let output_dir = absolute(&args.output_dir)?;

        if !fs.is_dir(&input_dir) {
            return Err(SlideWatchError::InputDirMissing(input_dir));
        }

        let mut config = load_or_default(args.config.as_deref())?;
        apply_overrides(&mut config, args);
        validate_config(&config)?;

        if !args.dry_run {
            fs.create_dir_all(&output_dir)?;
        }

        Ok(Self::from_parts(config, input_dir, output_dir, fs))
    }

    /// Build from already-validated parts, skipping directory checks.
    pub fn from_parts(
        config: ConfigFile,
        input_dir: PathBuf,
        output_dir: PathBuf,
        fs: Arc<dyn FileSystem>,
    ) -> Self {
        Self {
            config,
            input_dir,
            output_dir,
            fs,
        }
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    pub fn input_dir(&self) -> &Path {
        &self.input_dir
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn runner(&self, executor: Arc<dyn StageExecutor>) -> PipelineRunner {
        PipelineRunner::new(
            executor,
            self.config.tissue_detection.clone(),
            self.config.artifact_detection.clone(),
            &self.input_dir,
            &self.output_dir,
        )
    }

    /// Assemble the dispatcher with the given stage executor and ledger.
    pub fn dispatcher(
        &self,
        executor: Arc<dyn StageExecutor>,
        ledger: Arc<DedupeLedger>,
    ) -> Result<WatchDispatcher> {
        let filter = SlideFilter::new(&self.config.watch.patterns)?;
        let gate = StabilityGate::new(
            Arc::clone(&self.fs),
            Duration::from_millis(self.config.watch.poll_interval_ms),
            self.config.watch.stable_reads,
        );
        Ok(WatchDispatcher::new(
            filter,
            gate,
            ledger,
            self.runner(executor),
            self.config.dispatch.max_concurrent,
        ))
    }

    pub fn runtime_options(&self) -> RuntimeOptions {
        RuntimeOptions {
            grace_period: Duration::from_secs(self.config.dispatch.grace_period_secs),
        }
    }

    /// Watch until Ctrl-C / SIGTERM or a fatal watch-source failure.
    pub async fn run(self) -> Result<RunSummary> {
        let ledger = Arc::new(DedupeLedger::new());
        let dispatcher = Arc::new(self.dispatcher(Arc::new(CommandStageExecutor::new()), ledger)?);

        let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);

        let watcher = crate::watch::spawn_watcher(&self.input_dir, rt_tx.clone())
            .with_context(|| format!("watching {:?}", self.input_dir))?;

        spawn_signal_listener(rt_tx);

        info!("Watching directory {} for new slide files...", self.input_dir.display());
        info!("Output will be saved to {}", self.output_dir.display());
        info!("Press Ctrl+C to stop");

        Runtime::new(dispatcher, rt_rx, self.runtime_options())
            .with_watcher(watcher)
            .run()
            .await
    }

    /// Print the resolved configuration and stage command lines.
    pub fn print_dry_run(&self) {
        let sample = self.input_dir.join("<slide>");
        let runner = self.runner(Arc::new(CommandStageExecutor::new()));

        println!("slidewatch dry-run");
        println!("  input_dir  = {}", self.input_dir.display());
        println!("  output_dir = {}", self.output_dir.display());
        println!("  watch.patterns = {:?}", self.config.watch.patterns);
        println!("  watch.poll_interval_ms = {}", self.config.watch.poll_interval_ms);
        println!("  watch.stable_reads = {}", self.config.watch.stable_reads);
        println!("  dispatch.max_concurrent = {}", self.config.dispatch.max_concurrent);
        println!("  dispatch.grace_period_secs = {}", self.config.dispatch.grace_period_secs);
        println!();
        println!("stages:");
        for stage in Stage::ALL {
            let inv = runner.invocation(stage, &sample);
            println!("  - {stage}");
            println!("      cmd: {}", inv.command_line());
            if let Some(dir) = &inv.working_dir {
                println!("      working_dir: {}", dir.display());
            }
        }
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    Ok(std::path::absolute(path)?)
}

fn apply_overrides(config: &mut ConfigFile, args: &CliArgs) {
    if let Some(ms) = args.poll_interval_ms {
        config.watch.poll_interval_ms = ms;
    }
    if let Some(secs) = args.grace_period_secs {
        config.dispatch.grace_period_secs = secs;
    }
    if let Some(n) = args.max_concurrent {
        config.dispatch.max_concurrent = n;
    }
}

/// Ctrl-C (and SIGTERM on Unix) → `ShutdownRequested`.
fn spawn_signal_listener(tx: mpsc::Sender<RuntimeEvent>) {
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
    });
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut term = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            warn!(error = %e, "failed to listen for SIGTERM; Ctrl+C only");
            ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = ctrl_c() => {}
        _ = term.recv() => info!("received SIGTERM"),
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    ctrl_c().await;
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for Ctrl+C");
        // Without a signal source we simply never request shutdown.
        std::future::pending::<()>().await;
    }
}
