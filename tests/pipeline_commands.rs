// tests/pipeline_commands.rs
#![cfg(unix)]

use std::path::Path;
use std::sync::Arc;

use slidewatch::config::StageConfig;
use slidewatch::pipeline::{CommandStageExecutor, PipelineOutcome, PipelineRunner, StageFailure};
use slidewatch_test_utils::{init_tracing, with_timeout};
use tempfile::TempDir;

fn sh(script: &str) -> StageConfig {
    StageConfig {
        program: "sh".to_string(),
        args: vec!["-c".to_string(), script.to_string()],
        working_dir: None,
    }
}

fn runner(tmp: &TempDir, tissue: StageConfig, artifact: StageConfig) -> PipelineRunner {
    PipelineRunner::new(
        Arc::new(CommandStageExecutor::new()),
        tissue,
        artifact,
        tmp.path().join("in"),
        tmp.path().join("out"),
    )
}

fn setup() -> TempDir {
    init_tracing();
    let tmp = TempDir::new().unwrap();
    std::fs::create_dir_all(tmp.path().join("in")).unwrap();
    std::fs::create_dir_all(tmp.path().join("out")).unwrap();
    tmp
}

#[tokio::test]
async fn both_stages_run_against_the_directories() {
    let tmp = setup();
    let slide = tmp.path().join("in").join("slideA.svs");
    let runner = runner(
        &tmp,
        sh("test -d {input_dir} && touch {output_dir}/tissue_{slide_name}"),
        sh("test -f {output_dir}/tissue_{slide_name} && touch {output_dir}/artifact_done"),
    );

    let outcome = with_timeout(runner.run(&slide)).await;

    assert_eq!(outcome, PipelineOutcome::Completed);
    assert!(tmp.path().join("out/tissue_slideA").is_file());
    assert!(tmp.path().join("out/artifact_done").is_file());
}

#[tokio::test]
async fn failing_stage1_skips_stage2() {
    let tmp = setup();
    let slide = tmp.path().join("in").join("slideA.svs");
    let runner = runner(
        &tmp,
        sh("exit 1"),
        sh("touch {output_dir}/should_not_exist"),
    );

    let outcome = with_timeout(runner.run(&slide)).await;

    assert_eq!(
        outcome,
        PipelineOutcome::Stage1Failed(StageFailure::ExitCode(1))
    );
    assert!(!tmp.path().join("out/should_not_exist").exists());
}

#[tokio::test]
async fn missing_program_is_a_launch_failure() {
    let tmp = setup();
    let runner = runner(
        &tmp,
        StageConfig {
            program: "/nonexistent/slidewatch-stage".to_string(),
            args: Vec::new(),
            working_dir: None,
        },
        sh("exit 0"),
    );

    let outcome = with_timeout(runner.run(Path::new("/in/x.svs"))).await;

    assert!(
        matches!(outcome, PipelineOutcome::Stage1Failed(StageFailure::Launch(_))),
        "{outcome:?}"
    );
}

#[tokio::test]
async fn stage2_failure_is_reported_as_such() {
    let tmp = setup();
    let runner = runner(&tmp, sh("exit 0"), sh("exit 4"));

    let outcome = with_timeout(runner.run(Path::new("/in/x.svs"))).await;

    assert_eq!(
        outcome,
        PipelineOutcome::Stage2Failed(StageFailure::ExitCode(4))
    );
}

#[tokio::test]
async fn working_dir_is_honoured() {
    let tmp = setup();
    let mut tissue = sh("touch ./marker");
    tissue.working_dir = Some(tmp.path().join("out").to_string_lossy().into_owned());
    let runner = runner(&tmp, tissue, sh("exit 0"));

    let outcome = with_timeout(runner.run(Path::new("/in/x.svs"))).await;

    assert_eq!(outcome, PipelineOutcome::Completed);
    assert!(tmp.path().join("out/marker").is_file());
}
