// src/watch/watcher.rs

use std::path::{Path, PathBuf};

use anyhow::Result;
use notify::event::{CreateKind, ModifyKind, RemoveKind};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::engine::RuntimeEvent;

/// Handle for the filesystem watcher.
///
/// This exists mainly so the underlying `RecommendedWatcher` is kept alive for
/// as long as needed. Dropping this handle will stop file watching.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
    root: PathBuf,
}

impl WatcherHandle {
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").field("root", &self.root).finish()
    }
}

/// Spawn a non-recursive watcher on `root` that turns file creations into
/// `RuntimeEvent::FileCreated` and watch-source breakage into
/// `RuntimeEvent::WatchFailed`.
///
/// Slide filtering happens downstream in the dispatcher; this only knows
/// about creation versus everything else.
pub fn spawn_watcher(
    root: impl Into<PathBuf>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) -> Result<WatcherHandle> {
    let root = root.into();
    // Canonicalize once so we have a stable base path.
    let root = root.canonicalize().unwrap_or_else(|_| root.clone());

    // Channel from the blocking notify callback into the async world.
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<notify::Result<Event>>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| {
            if let Err(err) = event_tx.send(res) {
                // We can't log via tracing here easily, so fallback to stderr.
                eprintln!("slidewatch: failed to forward notify event: {err}");
            }
        },
        Config::default(),
    )?;

    watcher.watch(&root, RecursiveMode::NonRecursive)?;

    info!("file watcher started on {:?}", root);

    let async_root = root.clone();
    tokio::spawn(async move {
        while let Some(res) = event_rx.recv().await {
            let translated = match res {
                Ok(event) => {
                    debug!(?event, "received notify event");
                    classify_event(&async_root, &event)
                }
                Err(err) => {
                    warn!(error = %err, "file watch error");
                    vec![RuntimeEvent::WatchFailed {
                        reason: err.to_string(),
                    }]
                }
            };

            for ev in translated {
                if runtime_tx.send(ev).await.is_err() {
                    // Runtime is gone; nothing left to feed.
                    debug!("runtime channel closed; stopping watcher forwarding");
                    return;
                }
            }
        }
        debug!("watcher event loop finished");
    });

    Ok(WatcherHandle {
        _inner: watcher,
        root,
    })
}

/// Translate one notify event into runtime events.
///
/// - File creations become `FileCreated`, one per path.
/// - Removal or rename of the watched directory itself is fatal.
/// - Everything else (modify, access, child removals) is ignored.
pub fn classify_event(root: &Path, event: &Event) -> Vec<RuntimeEvent> {
    let touches_root = event.paths.iter().any(|p| p == root);

    match event.kind {
        EventKind::Remove(RemoveKind::Folder | RemoveKind::Any | RemoveKind::Other)
        | EventKind::Modify(ModifyKind::Name(_))
            if touches_root =>
        {
            vec![RuntimeEvent::WatchFailed {
                reason: format!("watched directory {:?} was removed or renamed", root),
            }]
        }
        EventKind::Create(CreateKind::Folder) => Vec::new(),
        EventKind::Create(_) => event
            .paths
            .iter()
            .filter(|p| p.as_path() != root)
            .map(|p| RuntimeEvent::FileCreated { path: p.clone() })
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, DataChange, RenameMode};

    fn root() -> PathBuf {
        PathBuf::from("/data/in")
    }

    fn event(kind: EventKind, path: &str) -> Event {
        Event::new(kind).add_path(PathBuf::from(path))
    }

    #[test]
    fn file_creation_is_forwarded() {
        let ev = event(EventKind::Create(CreateKind::File), "/data/in/a.svs");
        let out = classify_event(&root(), &ev);
        assert!(matches!(
            out.as_slice(),
            [RuntimeEvent::FileCreated { path }] if path == Path::new("/data/in/a.svs")
        ));
    }

    #[test]
    fn folder_creation_and_modifications_are_ignored() {
        let r = root();
        assert!(classify_event(&r, &event(EventKind::Create(CreateKind::Folder), "/data/in/sub")).is_empty());
        assert!(classify_event(
            &r,
            &event(EventKind::Modify(ModifyKind::Data(DataChange::Size)), "/data/in/a.svs")
        )
        .is_empty());
        assert!(classify_event(&r, &event(EventKind::Access(AccessKind::Any), "/data/in/a.svs")).is_empty());
    }

    #[test]
    fn removing_a_child_is_not_fatal() {
        let ev = event(EventKind::Remove(RemoveKind::File), "/data/in/a.svs");
        assert!(classify_event(&root(), &ev).is_empty());
    }

    #[test]
    fn removing_the_root_is_fatal() {
        let ev = event(EventKind::Remove(RemoveKind::Folder), "/data/in");
        assert!(matches!(
            classify_event(&root(), &ev).as_slice(),
            [RuntimeEvent::WatchFailed { .. }]
        ));

        let ev = event(EventKind::Modify(ModifyKind::Name(RenameMode::From)), "/data/in");
        assert!(matches!(
            classify_event(&root(), &ev).as_slice(),
            [RuntimeEvent::WatchFailed { .. }]
        ));
    }
}
