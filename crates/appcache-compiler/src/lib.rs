//! Application cache manifests as a build-pipeline add-on.
//!
//! The host build system hands every output file of a batch to
//! [`AppcacheCompiler`]; this crate digests the contents (SHA-1), keeps a
//! deduplicated sorted registry of cacheable paths, derives one
//! order-independent aggregate fingerprint per batch, and rewrites the
//! manifest file only when that fingerprint actually changed. Writes replace
//! the whole file atomically, so readers never observe a partial manifest.
//!
//! The per-batch protocol has two phases, mirroring a compile pipeline:
//! - [`AppcacheCompiler::begin_batch`] opens a batch of a declared size, then
//!   [`AppcacheCompiler::process_file`] runs once per file from any thread;
//! - once the host has joined all per-file results,
//!   [`AppcacheCompiler::complete_batch`] renders, gates, and persists.
//!
//! Hosts without concurrency can use [`AppcacheCompiler::run_batch`], which
//! drives the whole protocol over an in-memory file list.

mod batch;
mod compiler;
mod config;
mod digest;
mod error;
mod gate;
mod registry;
mod writer;

pub use batch::BatchSummary;
pub use compiler::{AppcacheCompiler, BatchOutcome, FileOutcome, SkipReason};
pub use config::AppcacheConfig;
pub use digest::{AggregateFingerprint, ContentDigest};
pub use error::CompilerError;
pub use gate::ChangeGate;
pub use registry::PathRegistry;
pub use writer::ManifestWriter;

pub type Result<T> = std::result::Result<T, CompilerError>;
