use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;

use crate::digest::{AggregateFingerprint, ContentDigest};

/// Fixed-size arena collecting one content digest per file of a batch.
///
/// Slot indexes come from an atomic dispenser and slots are filled from any
/// thread. Completion is a single increment-and-compare:
/// [`record`](Self::record) returns `true` for exactly the call that stores
/// the last expected digest, however arrivals interleave, so exactly one
/// caller runs the aggregation step. A check-then-act pair here would let
/// two late arrivals both observe "complete".
#[derive(Debug)]
pub(crate) struct DigestBatch {
    slots: Box<[OnceLock<ContentDigest>]>,
    claimed: AtomicUsize,
    recorded: AtomicUsize,
}

impl DigestBatch {
    pub(crate) fn new(expected: usize) -> Self {
        Self {
            slots: (0..expected).map(|_| OnceLock::new()).collect(),
            claimed: AtomicUsize::new(0),
            recorded: AtomicUsize::new(0),
        }
    }

    pub(crate) fn expected(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn recorded(&self) -> usize {
        self.recorded.load(Ordering::Acquire)
    }

    /// Hands out the next free slot index, `None` once all declared slots
    /// are taken.
    pub(crate) fn claim_slot(&self) -> Option<usize> {
        let index = self.claimed.fetch_add(1, Ordering::Relaxed);
        if index < self.slots.len() {
            Some(index)
        } else {
            None
        }
    }

    /// Stores `digest` into `slot` and advances the completion counter.
    /// Returns `true` exactly for the call that completes the batch.
    pub(crate) fn record(&self, slot: usize, digest: ContentDigest) -> bool {
        let stored = self.slots[slot].set(digest).is_ok();
        debug_assert!(stored, "slot {slot} recorded twice");

        let done = self.recorded.fetch_add(1, Ordering::AcqRel) + 1;
        done == self.slots.len()
    }

    pub(crate) fn is_complete(&self) -> bool {
        self.recorded.load(Ordering::Acquire) == self.slots.len()
    }

    /// Aggregate fingerprint over the recorded digests.
    ///
    /// Meaningful once the batch is complete; the acquire on the completion
    /// counter orders every slot write before this read.
    pub(crate) fn aggregate(&self) -> AggregateFingerprint {
        let digests: Vec<ContentDigest> = self
            .slots
            .iter()
            .filter_map(|slot| slot.get().cloned())
            .collect();
        AggregateFingerprint::combine(&digests)
    }
}

/// Immutable result of one completed batch.
///
/// Fingerprint and cache-path list are captured together at the completion
/// instant, so the manifest's `#` comment and its CACHE section always
/// describe the same batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    pub fingerprint: AggregateFingerprint,
    pub cache_paths: Vec<String>,
}
