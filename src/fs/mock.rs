// src/fs/mock.rs

use super::FileSystem;
use anyhow::{anyhow, Result};
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone)]
pub enum MockEntry {
    File(u64),
    Dir(Vec<String>), // List of child names
}

#[derive(Debug, Default)]
struct MockState {
    entries: HashMap<PathBuf, MockEntry>,
    /// Per-path queue of upcoming `file_size` answers; `None` = unreadable.
    scripts: HashMap<PathBuf, VecDeque<Option<u64>>>,
    reads: HashMap<PathBuf, usize>,
}

/// In-memory filesystem for tests.
///
/// Cloning shares state, so a test can keep a handle while the code under
/// test owns another.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    state: Arc<Mutex<MockState>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        let fs = Self::default();
        fs.lock().entries.insert(PathBuf::from("/"), MockEntry::Dir(Vec::new()));
        fs
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Add (or replace) a file with a fixed size.
    pub fn add_file(&self, path: impl AsRef<Path>, size: u64) {
        let path = path.as_ref().to_path_buf();
        let mut state = self.lock();
        state.entries.insert(path.clone(), MockEntry::File(size));
        if let Some(parent) = path.parent() {
            ensure_dir_entry(&mut state.entries, parent);
            link_child(&mut state.entries, parent, &path);
        }
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        ensure_dir_entry(&mut self.lock().entries, path.as_ref());
    }

    /// Script successive size readings for `path`.
    ///
    /// Each `file_size` call consumes one reading; the last one repeats
    /// forever. The file is created if missing.
    pub fn script_sizes(&self, path: impl AsRef<Path>, sizes: &[u64]) {
        self.script_reads(path, sizes.iter().copied().map(Some).collect());
    }

    /// Like [`script_sizes`](Self::script_sizes), but `None` makes that
    /// reading fail as if the file had vanished.
    pub fn script_reads(&self, path: impl AsRef<Path>, reads: Vec<Option<u64>>) {
        let path = path.as_ref().to_path_buf();
        let first = reads.iter().flatten().next().copied().unwrap_or(0);
        self.add_file(&path, first);
        self.lock().scripts.insert(path, reads.into());
    }

    pub fn remove(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let mut state = self.lock();
        state.entries.remove(path);
        state.scripts.remove(path);
    }

    /// How many times `file_size` was called for `path`.
    pub fn size_reads(&self, path: impl AsRef<Path>) -> usize {
        self.lock().reads.get(path.as_ref()).copied().unwrap_or(0)
    }
}

fn ensure_dir_entry(entries: &mut HashMap<PathBuf, MockEntry>, path: &Path) {
    if entries.contains_key(path) {
        return;
    }
    entries.insert(path.to_path_buf(), MockEntry::Dir(Vec::new()));
    if let Some(parent) = path.parent() {
        if parent != path && !parent.as_os_str().is_empty() {
            ensure_dir_entry(entries, parent);
            link_child(entries, parent, path);
        }
    }
}

fn link_child(entries: &mut HashMap<PathBuf, MockEntry>, parent: &Path, child: &Path) {
    if let Some(MockEntry::Dir(children)) = entries.get_mut(parent) {
        if let Some(name) = child.file_name().and_then(|n| n.to_str()) {
            if !children.iter().any(|c| c == name) {
                children.push(name.to_string());
            }
        }
    }
}

impl FileSystem for MockFileSystem {
    fn file_size(&self, path: &Path) -> Result<u64> {
        let mut state = self.lock();
        *state.reads.entry(path.to_path_buf()).or_insert(0) += 1;

        if let Some(script) = state.scripts.get_mut(path) {
            let reading = if script.len() > 1 {
                script.pop_front().flatten()
            } else {
                script.front().copied().flatten()
            };
            return reading.ok_or_else(|| anyhow!("File not found: {:?}", path));
        }

        match state.entries.get(path) {
            Some(MockEntry::File(size)) => Ok(*size),
            Some(MockEntry::Dir(_)) => Err(anyhow!("Is a directory: {:?}", path)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn is_dir(&self, path: &Path) -> bool {
        matches!(self.lock().entries.get(path), Some(MockEntry::Dir(_)))
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        let mut state = self.lock();
        if let Some(MockEntry::File(_)) = state.entries.get(path) {
            return Err(anyhow!("File exists: {:?}", path));
        }
        ensure_dir_entry(&mut state.entries, path);
        Ok(())
    }
}
