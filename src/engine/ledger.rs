// src/engine/ledger.rs

//! In-memory record of slides this watcher has claimed.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// Set of claimed slide paths.
///
/// A claim is the exclusive right to run the pipeline for a path. It is taken
/// after the file settles, kept on success, and released on failure so a later
/// creation event may retry. Check-and-insert happens under one lock, so two
/// concurrent events for the same path can never both win.
///
/// Not persisted: a restart forgets everything.
#[derive(Debug, Default)]
pub struct DedupeLedger {
    claims: Mutex<HashSet<PathBuf>>,
}

impl DedupeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<PathBuf>> {
        // A panic elsewhere can't leave the set half-updated, so keep going.
        self.claims.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Claim `path`. Returns `false` if it is already claimed.
    pub fn try_claim(&self, path: &Path) -> bool {
        self.lock().insert(path.to_path_buf())
    }

    /// Drop the claim on `path`. Returns whether a claim existed.
    pub fn release(&self, path: &Path) -> bool {
        self.lock().remove(path)
    }

    pub fn is_claimed(&self, path: &Path) -> bool {
        self.lock().contains(path)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn claim_is_exclusive_until_released() {
        let ledger = DedupeLedger::new();
        let p = Path::new("/in/a.svs");

        assert!(ledger.try_claim(p));
        assert!(!ledger.try_claim(p));
        assert!(ledger.is_claimed(p));

        assert!(ledger.release(p));
        assert!(!ledger.release(p));
        assert!(ledger.try_claim(p));
    }

    #[test]
    fn paths_are_independent() {
        let ledger = DedupeLedger::new();
        assert!(ledger.try_claim(Path::new("/in/a.svs")));
        assert!(ledger.try_claim(Path::new("/in/b.svs")));
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn concurrent_claims_have_one_winner() {
        let ledger = Arc::new(DedupeLedger::new());
        let winners: usize = (0..16)
            .map(|_| {
                let ledger = Arc::clone(&ledger);
                std::thread::spawn(move || ledger.try_claim(Path::new("/in/race.svs")))
            })
            .collect::<Vec<_>>()
            .into_iter()
            .map(|h| h.join().unwrap() as usize)
            .sum();
        assert_eq!(winners, 1);
    }
}
