use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::batch::{BatchSummary, DigestBatch};
use crate::config::AppcacheConfig;
use crate::digest::{AggregateFingerprint, ContentDigest};
use crate::error::CompilerError;
use crate::gate::ChangeGate;
use crate::registry::PathRegistry;
use crate::writer::ManifestWriter;

/// Per-file result of [`AppcacheCompiler::process_file`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOutcome {
    /// Content digest that entered the batch aggregate.
    pub digest: ContentDigest,
    /// Whether this call added the path to the cacheable set. `false` for
    /// excluded paths and for paths already registered by an earlier batch.
    pub cache_listed: bool,
}

/// Result of [`AppcacheCompiler::complete_batch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    /// The manifest was rewritten and this fingerprint is now committed.
    Committed(AggregateFingerprint),
    /// Nothing was written.
    Skipped(SkipReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The batch aggregate equals the committed fingerprint; the manifest
    /// on disk already describes this content.
    FingerprintUnchanged,
    /// Completion ran without an open batch (no `begin_batch`, a second
    /// completion, or an aborted batch); there is nothing to describe.
    NoBatch,
}

#[derive(Debug)]
enum BatchPhase {
    Idle,
    Digesting(Arc<DigestBatch>),
    AggregateReady(BatchSummary),
}

/// The host-facing compiler: digests one batch of build output at a time
/// and keeps the manifest on disk in step with it.
///
/// All hooks take `&self` and are safe to call from any thread. Per batch
/// the protocol is: [`begin_batch`](Self::begin_batch) with the declared
/// file count, one [`process_file`](Self::process_file) (or
/// [`process_reader`](Self::process_reader)) per file in any order and from
/// any thread, and one [`complete_batch`](Self::complete_batch) after the
/// host has joined every per-file result. The cacheable-path
/// registry and the committed fingerprint persist across batches; digest
/// state never does.
#[derive(Debug)]
pub struct AppcacheCompiler {
    config: AppcacheConfig,
    writer: ManifestWriter,
    registry: Mutex<PathRegistry>,
    phase: Mutex<BatchPhase>,
    gate: ChangeGate,
}

impl AppcacheCompiler {
    /// Builds a compiler writing `config.manifest_file` inside `public_dir`.
    ///
    /// Fails fast on an unparseable ignore pattern rather than on the first
    /// file of the first batch.
    pub fn new(public_dir: impl Into<PathBuf>, config: AppcacheConfig) -> crate::Result<Self> {
        let registry = PathRegistry::new(config.ignore_matcher()?, config.manifest_suffix());
        let writer = ManifestWriter::new(public_dir.into().join(&config.manifest_file));
        Ok(Self {
            config,
            writer,
            registry: Mutex::new(registry),
            phase: Mutex::new(BatchPhase::Idle),
            gate: ChangeGate::new(),
        })
    }

    /// Where the manifest is (or will be) written.
    pub fn manifest_path(&self) -> &Path {
        self.writer.path()
    }

    pub fn config(&self) -> &AppcacheConfig {
        &self.config
    }

    /// Fingerprint of the manifest currently on disk, if any batch
    /// committed yet.
    pub fn committed_fingerprint(&self) -> Option<AggregateFingerprint> {
        self.gate.committed()
    }

    /// Opens a batch expecting `expected` files.
    ///
    /// Any batch still in flight is abandoned: batch boundaries are the
    /// reset points for digest state. A zero-file batch is complete
    /// immediately and goes straight to the aggregate-ready state.
    pub fn begin_batch(&self, expected: usize) {
        let mut phase = lock_unpoison(&self.phase);
        match &*phase {
            BatchPhase::Digesting(previous) if !previous.is_complete() => {
                tracing::debug!(
                    target = "appcache.compiler",
                    recorded = previous.recorded(),
                    expected = previous.expected(),
                    "abandoning incomplete batch at new batch start"
                );
            }
            BatchPhase::AggregateReady(_) => {
                tracing::debug!(
                    target = "appcache.compiler",
                    "abandoning unconsumed batch result at new batch start"
                );
            }
            _ => {}
        }
        *phase = if expected == 0 {
            BatchPhase::AggregateReady(BatchSummary {
                fingerprint: AggregateFingerprint::combine(&[]),
                cache_paths: lock_unpoison(&self.registry).snapshot(),
            })
        } else {
            BatchPhase::Digesting(Arc::new(DigestBatch::new(expected)))
        };
        tracing::debug!(target = "appcache.compiler", expected, "batch opened");
    }

    /// Digests one batch file handed over as bytes.
    ///
    /// Callable from any thread while the batch is digesting. The call that
    /// records the final expected digest also snapshots the registry and
    /// seals both into the batch result.
    pub fn process_file(
        &self,
        path: &str,
        content: impl AsRef<[u8]>,
    ) -> crate::Result<FileOutcome> {
        let (batch, slot) = self.claim(path)?;
        let digest = ContentDigest::from_bytes(content);
        let cache_listed = lock_unpoison(&self.registry).consider(path);
        self.record(&batch, slot, digest.clone());
        Ok(FileOutcome {
            digest,
            cache_listed,
        })
    }

    /// Digests one batch file from a reader, for hosts that stream output
    /// files instead of buffering them.
    ///
    /// A read failure aborts the batch: the error is the per-file result
    /// the host's join sees, nothing is committed, and the manifest on disk
    /// stays untouched.
    pub fn process_reader(
        &self,
        path: &str,
        reader: impl std::io::Read,
    ) -> crate::Result<FileOutcome> {
        let (batch, slot) = self.claim(path)?;
        let digest = match ContentDigest::from_reader(reader) {
            Ok(digest) => digest,
            Err(source) => {
                self.abort_if_current(&batch);
                tracing::debug!(
                    target = "appcache.compiler",
                    path,
                    "batch aborted after read failure"
                );
                return Err(CompilerError::Read {
                    path: path.to_string(),
                    source,
                });
            }
        };
        let cache_listed = lock_unpoison(&self.registry).consider(path);
        self.record(&batch, slot, digest.clone());
        Ok(FileOutcome {
            digest,
            cache_listed,
        })
    }

    /// Completion hook, run once per batch after the host joined every
    /// per-file result.
    ///
    /// With the aggregate ready this gates on the committed fingerprint:
    /// unchanged batches skip without touching the filesystem, changed ones
    /// render and atomically replace the manifest, committing the
    /// fingerprint only after the write succeeded. Completing while files
    /// are still outstanding drops the batch and errors; completing with no
    /// batch open skips.
    pub fn complete_batch(&self) -> crate::Result<BatchOutcome> {
        let mut phase = lock_unpoison(&self.phase);
        let taken = std::mem::replace(&mut *phase, BatchPhase::Idle);
        drop(phase);

        let summary = match taken {
            BatchPhase::AggregateReady(summary) => summary,
            // The final record can still be between its counter increment
            // and the phase transition; the digests are all present, so
            // build the bundle here.
            BatchPhase::Digesting(batch) if batch.is_complete() => BatchSummary {
                fingerprint: batch.aggregate(),
                cache_paths: lock_unpoison(&self.registry).snapshot(),
            },
            BatchPhase::Digesting(batch) => {
                return Err(CompilerError::BatchIncomplete {
                    recorded: batch.recorded(),
                    expected: batch.expected(),
                });
            }
            BatchPhase::Idle => {
                tracing::debug!(
                    target = "appcache.compiler",
                    "completion without an open batch"
                );
                return Ok(BatchOutcome::Skipped(SkipReason::NoBatch));
            }
        };

        if !self.gate.should_commit(&summary.fingerprint) {
            tracing::debug!(
                target = "appcache.compiler",
                fingerprint = %summary.fingerprint,
                "manifest unchanged; skipping write"
            );
            return Ok(BatchOutcome::Skipped(SkipReason::FingerprintUnchanged));
        }

        let text = ManifestWriter::render(&summary, &self.config);
        self.writer.persist(&text)?;
        self.gate.commit(summary.fingerprint.clone());
        tracing::debug!(
            target = "appcache.compiler",
            path = %self.writer.path().display(),
            fingerprint = %summary.fingerprint,
            cache_paths = summary.cache_paths.len(),
            "manifest written"
        );
        Ok(BatchOutcome::Committed(summary.fingerprint))
    }

    /// Drops any open batch, for hosts whose own per-file reads failed.
    /// Never touches the committed fingerprint or the manifest on disk.
    pub fn abort_batch(&self) {
        let mut phase = lock_unpoison(&self.phase);
        if !matches!(&*phase, BatchPhase::Idle) {
            tracing::debug!(target = "appcache.compiler", "batch aborted");
            *phase = BatchPhase::Idle;
        }
    }

    /// Runs the whole batch protocol over an in-memory file list, for hosts
    /// without their own concurrency.
    pub fn run_batch<P, C>(&self, files: &[(P, C)]) -> crate::Result<BatchOutcome>
    where
        P: AsRef<str>,
        C: AsRef<[u8]>,
    {
        self.begin_batch(files.len());
        for (path, content) in files {
            self.process_file(path.as_ref(), content)?;
        }
        self.complete_batch()
    }

    fn claim(&self, path: &str) -> crate::Result<(Arc<DigestBatch>, usize)> {
        let phase = lock_unpoison(&self.phase);
        let batch = match &*phase {
            BatchPhase::Digesting(batch) => Arc::clone(batch),
            BatchPhase::Idle | BatchPhase::AggregateReady(_) => {
                tracing::debug!(
                    target = "appcache.compiler",
                    path,
                    "per-file processing outside an open batch"
                );
                return Err(CompilerError::NoActiveBatch);
            }
        };
        drop(phase);

        let slot = batch.claim_slot().ok_or(CompilerError::BatchOverflow {
            expected: batch.expected(),
        })?;
        Ok((batch, slot))
    }

    fn record(&self, batch: &Arc<DigestBatch>, slot: usize, digest: ContentDigest) {
        if !batch.record(slot, digest) {
            return;
        }

        // Completing call: bundle the aggregate with the registry snapshot
        // while both still describe this batch.
        let summary = BatchSummary {
            fingerprint: batch.aggregate(),
            cache_paths: lock_unpoison(&self.registry).snapshot(),
        };
        let mut phase = lock_unpoison(&self.phase);
        match &*phase {
            BatchPhase::Digesting(current) if Arc::ptr_eq(current, batch) => {
                tracing::debug!(
                    target = "appcache.compiler",
                    fingerprint = %summary.fingerprint,
                    cache_paths = summary.cache_paths.len(),
                    "batch aggregate ready"
                );
                *phase = BatchPhase::AggregateReady(summary);
            }
            _ => {
                // The batch was abandoned or aborted while this digest was
                // in flight; its result belongs to no batch.
                tracing::debug!(
                    target = "appcache.compiler",
                    "discarding completion of an abandoned batch"
                );
            }
        }
    }

    fn abort_if_current(&self, batch: &Arc<DigestBatch>) {
        let mut phase = lock_unpoison(&self.phase);
        if matches!(&*phase, BatchPhase::Digesting(current) if Arc::ptr_eq(current, batch)) {
            *phase = BatchPhase::Idle;
        }
    }
}

fn lock_unpoison<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|err| err.into_inner())
}
