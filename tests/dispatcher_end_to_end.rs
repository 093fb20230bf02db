// tests/dispatcher_end_to_end.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use slidewatch::config::ConfigFile;
use slidewatch::engine::{DedupeLedger, FileOutcome, WatchDispatcher};
use slidewatch::fs::mock::MockFileSystem;
use slidewatch::pipeline::{PipelineOutcome, Stage, StageFailure};
use slidewatch_test_utils::{
    init_tracing, supervisor_for, with_timeout, ConfigBuilder, ScriptedStageExecutor,
};

const SLIDE_A: &str = "/in/slideA.svs";

struct Harness {
    fs: MockFileSystem,
    exec: Arc<ScriptedStageExecutor>,
    ledger: Arc<DedupeLedger>,
    dispatcher: Arc<WatchDispatcher>,
}

fn harness_with(cfg: ConfigFile, exec: ScriptedStageExecutor) -> Harness {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_dir("/in");
    let exec = Arc::new(exec);
    let ledger = Arc::new(DedupeLedger::new());
    let dispatcher = supervisor_for(cfg, Arc::new(fs.clone()), "/in", "/out")
        .dispatcher(exec.clone(), ledger.clone())
        .unwrap();
    Harness {
        fs,
        exec,
        ledger,
        dispatcher: Arc::new(dispatcher),
    }
}

fn harness() -> Harness {
    harness_with(ConfigBuilder::new().build(), ScriptedStageExecutor::new())
}

#[tokio::test]
async fn new_slide_runs_both_stages_once() {
    let h = harness();
    h.fs.script_sizes(SLIDE_A, &[200, 600, 1000, 1000]);

    let outcome = with_timeout(h.dispatcher.handle_created(SLIDE_A.into())).await;
    assert_eq!(outcome, FileOutcome::Finished(PipelineOutcome::Completed));
    assert_eq!(h.fs.size_reads(SLIDE_A), 4);
    assert_eq!(h.exec.calls(Stage::TissueDetection), 1);
    assert_eq!(h.exec.calls(Stage::ArtifactDetection), 1);
    assert!(h.ledger.is_claimed(Path::new(SLIDE_A)));

    // A second creation event for the same path is a no-op.
    let again = with_timeout(h.dispatcher.handle_created(SLIDE_A.into())).await;
    assert_eq!(again, FileOutcome::AlreadyProcessed);
    assert_eq!(h.exec.calls(Stage::TissueDetection), 1);
    assert_eq!(h.exec.calls(Stage::ArtifactDetection), 1);
}

#[tokio::test]
async fn stages_run_in_order_with_directory_arguments() {
    let h = harness();
    h.fs.script_sizes(SLIDE_A, &[1000]);

    with_timeout(h.dispatcher.handle_created(SLIDE_A.into())).await;

    let invocations = h.exec.invocations();
    assert_eq!(invocations.len(), 2);
    assert_eq!(invocations[0].stage, Stage::TissueDetection);
    assert_eq!(
        invocations[0].args,
        vec!["wsi_tis_detect.py", "--slide_folder", "/in", "--output_dir", "/out"]
    );
    assert_eq!(invocations[1].stage, Stage::ArtifactDetection);
    assert_eq!(invocations[1].args[0], "main.py");
    assert!(invocations.iter().all(|i| i.slide == PathBuf::from(SLIDE_A)));
}

#[tokio::test]
async fn stage1_failure_releases_claim_and_allows_retry() {
    let h = harness();
    h.fs.script_sizes(SLIDE_A, &[1000]);
    h.exec.push_exit(Stage::TissueDetection, 1);

    let outcome = with_timeout(h.dispatcher.handle_created(SLIDE_A.into())).await;
    assert_eq!(
        outcome,
        FileOutcome::Finished(PipelineOutcome::Stage1Failed(StageFailure::ExitCode(1)))
    );
    assert_eq!(h.exec.calls(Stage::ArtifactDetection), 0);
    assert!(!h.ledger.is_claimed(Path::new(SLIDE_A)));

    // A later creation event for the same name retries from scratch.
    let retry = with_timeout(h.dispatcher.handle_created(SLIDE_A.into())).await;
    assert_eq!(retry, FileOutcome::Finished(PipelineOutcome::Completed));
    assert_eq!(h.exec.calls(Stage::TissueDetection), 2);
    assert_eq!(h.exec.calls(Stage::ArtifactDetection), 1);
    assert!(h.ledger.is_claimed(Path::new(SLIDE_A)));
}

#[tokio::test]
async fn stage2_failure_releases_claim() {
    let h = harness();
    h.fs.script_sizes(SLIDE_A, &[1000]);
    h.exec.push_exit(Stage::ArtifactDetection, 2);

    let outcome = with_timeout(h.dispatcher.handle_created(SLIDE_A.into())).await;
    assert_eq!(
        outcome,
        FileOutcome::Finished(PipelineOutcome::Stage2Failed(StageFailure::ExitCode(2)))
    );
    assert!(h.ledger.is_empty());
}

#[tokio::test]
async fn vanished_file_is_not_claimed() {
    let h = harness();
    h.fs.script_reads(SLIDE_A, vec![Some(10), Some(20), None]);

    let outcome = with_timeout(h.dispatcher.handle_created(SLIDE_A.into())).await;
    assert_eq!(outcome, FileOutcome::Unavailable);
    assert!(h.ledger.is_empty());
    assert!(h.exec.invocations().is_empty());
}

#[tokio::test]
async fn non_slide_files_are_ignored() {
    let h = harness();
    h.fs.add_file("/in/notes.txt", 12);

    let outcome = h.dispatcher.handle_created("/in/notes.txt".into()).await;
    assert_eq!(outcome, FileOutcome::Ignored);
    assert_eq!(h.fs.size_reads("/in/notes.txt"), 0);
}

#[tokio::test]
async fn upper_case_extension_is_a_slide() {
    let h = harness();
    h.fs.script_sizes("/in/SLIDE_B.SVS", &[5]);

    let outcome = with_timeout(h.dispatcher.handle_created("/in/SLIDE_B.SVS".into())).await;
    assert_eq!(outcome, FileOutcome::Finished(PipelineOutcome::Completed));
}

#[tokio::test]
async fn extra_patterns_widen_the_filter() {
    let h = harness_with(
        ConfigBuilder::new().pattern("*.ndpi").build(),
        ScriptedStageExecutor::new(),
    );
    h.fs.script_sizes("/in/case.ndpi", &[64]);

    let outcome = with_timeout(h.dispatcher.handle_created("/in/case.ndpi".into())).await;
    assert_eq!(outcome, FileOutcome::Finished(PipelineOutcome::Completed));
}

#[tokio::test]
async fn duplicate_events_in_flight_run_the_pipeline_once() {
    let h = harness_with(
        ConfigBuilder::new().max_concurrent(4).build(),
        ScriptedStageExecutor::new().with_delay(Duration::from_millis(30)),
    );
    h.fs.script_sizes(SLIDE_A, &[1000]);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let d = Arc::clone(&h.dispatcher);
            tokio::spawn(async move { d.handle_created(SLIDE_A.into()).await })
        })
        .collect();

    let mut outcomes = Vec::new();
    for handle in handles {
        outcomes.push(with_timeout(handle).await.unwrap());
    }

    let completed = outcomes
        .iter()
        .filter(|o| **o == FileOutcome::Finished(PipelineOutcome::Completed))
        .count();
    assert_eq!(completed, 1, "outcomes: {outcomes:?}");
    assert!(outcomes.iter().all(|o| matches!(
        o,
        FileOutcome::Finished(PipelineOutcome::Completed)
            | FileOutcome::Duplicate
            | FileOutcome::AlreadyProcessed
    )));
    assert_eq!(h.exec.calls(Stage::TissueDetection), 1);
    assert_eq!(h.exec.calls(Stage::ArtifactDetection), 1);
}

#[tokio::test]
async fn losing_duplicate_keeps_winner_claimed_while_it_runs() {
    let h = harness_with(
        ConfigBuilder::new().max_concurrent(4).build(),
        ScriptedStageExecutor::new().with_delay(Duration::from_millis(500)),
    );
    h.fs.script_sizes(SLIDE_A, &[1000]);

    // On the single-threaded test runtime both workers pass the pre-check
    // before either can claim: claiming needs two reads with a sleep between.
    let spawn = || {
        let d = Arc::clone(&h.dispatcher);
        tokio::spawn(async move { d.handle_created(SLIDE_A.into()).await })
    };
    let first = spawn();
    let second = spawn();

    with_timeout(async {
        while !(first.is_finished() || second.is_finished()) {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await;
    let (loser, winner) = if first.is_finished() {
        (first, second)
    } else {
        (second, first)
    };

    assert_eq!(loser.await.unwrap(), FileOutcome::Duplicate);
    assert!(!winner.is_finished());
    assert!(h.ledger.is_claimed(Path::new(SLIDE_A)));

    // A third event while the winner is still running must not start a run.
    let third = with_timeout(h.dispatcher.handle_created(SLIDE_A.into())).await;
    assert!(
        matches!(third, FileOutcome::AlreadyProcessed | FileOutcome::Duplicate),
        "{third:?}"
    );

    let outcome = with_timeout(winner).await.unwrap();
    assert_eq!(outcome, FileOutcome::Finished(PipelineOutcome::Completed));
    assert_eq!(h.exec.calls(Stage::TissueDetection), 1);
    assert_eq!(h.exec.calls(Stage::ArtifactDetection), 1);
}

#[tokio::test]
async fn pipelines_respect_concurrency_limit() {
    let h = harness_with(
        ConfigBuilder::new().max_concurrent(1).build(),
        ScriptedStageExecutor::new().with_delay(Duration::from_millis(10)),
    );

    let slides = ["/in/a.svs", "/in/b.svs", "/in/c.svs"];
    for s in slides {
        h.fs.script_sizes(s, &[100]);
    }

    let handles: Vec<_> = slides
        .iter()
        .map(|s| {
            let d = Arc::clone(&h.dispatcher);
            let path = PathBuf::from(s);
            tokio::spawn(async move { d.handle_created(path).await })
        })
        .collect();
    for handle in handles {
        let outcome = with_timeout(handle).await.unwrap();
        assert_eq!(outcome, FileOutcome::Finished(PipelineOutcome::Completed));
    }

    assert_eq!(h.exec.peak_concurrency(), 1);
    assert_eq!(h.ledger.len(), 3);
}

#[tokio::test]
async fn closed_dispatcher_cancels_and_releases() {
    let h = harness();
    h.fs.script_sizes(SLIDE_A, &[1000]);
    h.dispatcher.close();

    let outcome = with_timeout(h.dispatcher.handle_created(SLIDE_A.into())).await;
    assert_eq!(outcome, FileOutcome::Cancelled);
    assert!(h.ledger.is_empty());
    assert!(h.exec.invocations().is_empty());
}
