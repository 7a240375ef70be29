use std::sync::{Mutex, MutexGuard};

use crate::digest::AggregateFingerprint;

/// Remembers the last fingerprint whose manifest write succeeded, so
/// unchanged batches skip the write entirely.
///
/// [`commit`](Self::commit) runs only after a successful write. A failed
/// write therefore leaves the gate unchanged and the next batch with the
/// same fingerprint retries instead of being treated as already persisted.
#[derive(Debug, Default)]
pub struct ChangeGate {
    committed: Mutex<Option<AggregateFingerprint>>,
}

impl ChangeGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` iff nothing was ever committed or `next` differs from the
    /// committed fingerprint.
    pub fn should_commit(&self, next: &AggregateFingerprint) -> bool {
        lock_unpoison(&self.committed)
            .as_ref()
            .map_or(true, |committed| committed != next)
    }

    /// Records `next` as the fingerprint now on disk.
    pub fn commit(&self, next: AggregateFingerprint) {
        *lock_unpoison(&self.committed) = Some(next);
    }

    /// Fingerprint of the manifest currently on disk, if any write
    /// succeeded yet.
    pub fn committed(&self) -> Option<AggregateFingerprint> {
        lock_unpoison(&self.committed).clone()
    }
}

fn lock_unpoison<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|err| err.into_inner())
}
