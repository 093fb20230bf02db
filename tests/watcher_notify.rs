// tests/watcher_notify.rs

use std::fs;
use std::time::Duration;

use slidewatch::engine::RuntimeEvent;
use slidewatch::watch::spawn_watcher;
use slidewatch_test_utils::{init_tracing, with_timeout};
use tempfile::TempDir;
use tokio::sync::mpsc;

async fn next_created(rx: &mut mpsc::Receiver<RuntimeEvent>, name: &str) -> RuntimeEvent {
    with_timeout(async {
        loop {
            match rx.recv().await {
                Some(RuntimeEvent::FileCreated { path })
                    if path.file_name().and_then(|n| n.to_str()) == Some(name) =>
                {
                    return RuntimeEvent::FileCreated { path };
                }
                Some(_) => continue,
                None => panic!("watcher channel closed before {name} was seen"),
            }
        }
    })
    .await
}

#[tokio::test]
async fn new_file_in_watched_dir_is_reported() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let (tx, mut rx) = mpsc::channel(64);

    let handle = spawn_watcher(dir.path(), tx).unwrap();
    assert!(handle.root().is_absolute());

    // Give the backend a moment to register the watch.
    tokio::time::sleep(Duration::from_millis(100)).await;
    fs::write(dir.path().join("slideA.svs"), b"partial").unwrap();

    match next_created(&mut rx, "slideA.svs").await {
        RuntimeEvent::FileCreated { path } => {
            assert!(path.starts_with(handle.root()));
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test]
async fn watching_a_missing_dir_fails_up_front() {
    let dir = TempDir::new().unwrap();
    let (tx, _rx) = mpsc::channel(1);
    assert!(spawn_watcher(dir.path().join("missing"), tx).is_err());
}
