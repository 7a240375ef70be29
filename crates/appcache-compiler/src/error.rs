use std::path::PathBuf;

/// Errors produced while digesting batches and persisting the manifest.
///
/// Failures never leave partial manifest content on disk and never advance
/// the committed fingerprint: a failed batch is simply retried by the next
/// one. There is no retry logic here.
#[derive(Debug, thiserror::Error)]
pub enum CompilerError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to write manifest {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid ignore pattern `{pattern}`: {source}")]
    InvalidIgnorePattern {
        pattern: String,
        source: regex::Error,
    },

    #[error("no batch is open: begin_batch must run before per-file processing")]
    NoActiveBatch,

    #[error("batch overflow: more files processed than the declared {expected}")]
    BatchOverflow { expected: usize },

    #[error("batch incomplete: {recorded} of {expected} files recorded at completion")]
    BatchIncomplete { recorded: usize, expected: usize },
}
