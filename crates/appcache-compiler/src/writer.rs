use std::fs;
use std::io;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use appcache_manifest::ManifestDocument;

use crate::batch::BatchSummary;
use crate::config::AppcacheConfig;
use crate::error::CompilerError;

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Renders batch results into manifest text and persists it with atomic
/// full-file replacement.
///
/// A reader (web server, deploy script) either sees the previous manifest
/// or the new one, never a prefix: the text goes to a uniquely named
/// sibling temp file, is synced, and is renamed over the destination. Any
/// failure surfaces as [`CompilerError::Write`], removes the temp file and
/// leaves the previous manifest untouched. There are no retries.
#[derive(Debug)]
pub struct ManifestWriter {
    path: PathBuf,
}

impl ManifestWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Destination the manifest is written to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Manifest text for a completed batch under `config`.
    ///
    /// NETWORK, FALLBACK, the static root and external entries come from
    /// config; fingerprint and cache paths come from the batch bundle, so
    /// both always describe the same batch.
    pub fn render(summary: &BatchSummary, config: &AppcacheConfig) -> String {
        let document = ManifestDocument {
            fingerprint: summary.fingerprint.as_str().to_string(),
            network: config.network.clone(),
            fallback: config.fallback.clone(),
            static_root: config.static_root.clone(),
            cache_paths: summary.cache_paths.clone(),
            external_entries: config.external_cache_entries.clone(),
        };
        document.render()
    }

    /// Atomically replaces the manifest with `text`, creating parent
    /// directories as needed.
    pub fn persist(&self, text: &str) -> crate::Result<()> {
        let path = &self.path;
        let Some(parent) = path.parent() else {
            return Err(write_error(path, io::Error::other("path has no parent")));
        };
        let parent = if parent.as_os_str().is_empty() {
            Path::new(".")
        } else {
            parent
        };

        fs::create_dir_all(parent).map_err(|source| write_error(path, source))?;

        let (tmp_path, mut file) =
            open_unique_tmp_file(path, parent).map_err(|source| write_error(path, source))?;
        let write_result = file.write_all(text.as_bytes()).and_then(|()| file.sync_all());
        if let Err(source) = write_result {
            drop(file);
            remove_tmp_best_effort(&tmp_path, "write failure");
            return Err(write_error(path, source));
        }
        drop(file);

        // On Windows `rename` refuses to overwrite. At most one manifest
        // write is ever in flight per compiler instance, so one remove is
        // enough; no retry loop.
        let rename_result = fs::rename(&tmp_path, path).or_else(|err| {
            if cfg!(windows) && (err.kind() == io::ErrorKind::AlreadyExists || path.exists()) {
                match fs::remove_file(path) {
                    Ok(()) => fs::rename(&tmp_path, path),
                    Err(remove_err) if remove_err.kind() == io::ErrorKind::NotFound => {
                        fs::rename(&tmp_path, path)
                    }
                    Err(remove_err) => Err(remove_err),
                }
            } else {
                Err(err)
            }
        });

        match rename_result {
            Ok(()) => {
                sync_dir_best_effort(parent);
                Ok(())
            }
            Err(source) => {
                remove_tmp_best_effort(&tmp_path, "rename failure");
                Err(write_error(path, source))
            }
        }
    }
}

fn write_error(path: &Path, source: io::Error) -> CompilerError {
    CompilerError::Write {
        path: path.to_path_buf(),
        source,
    }
}

fn open_unique_tmp_file(dest: &Path, parent: &Path) -> io::Result<(PathBuf, fs::File)> {
    let file_name = dest
        .file_name()
        .ok_or_else(|| io::Error::other("destination path has no file name"))?;
    let pid = std::process::id();

    loop {
        let counter = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        let mut tmp_name = file_name.to_os_string();
        tmp_name.push(format!(".tmp.{pid}.{counter}"));
        let tmp_path = parent.join(tmp_name);

        match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&tmp_path)
        {
            Ok(file) => return Ok((tmp_path, file)),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(err) => return Err(err),
        }
    }
}

fn remove_tmp_best_effort(tmp_path: &Path, reason: &'static str) {
    if let Err(err) = fs::remove_file(tmp_path) {
        if err.kind() != io::ErrorKind::NotFound {
            tracing::debug!(
                target = "appcache.writer",
                path = %tmp_path.display(),
                reason,
                error = %err,
                "failed to remove temporary manifest file"
            );
        }
    }
}

fn sync_dir_best_effort(dir: &Path) {
    #[cfg(unix)]
    {
        match fs::File::open(dir).and_then(|dir| dir.sync_all()) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => {
                tracing::debug!(
                    target = "appcache.writer",
                    dir = %dir.display(),
                    error = %err,
                    "failed to sync manifest directory (best effort)"
                );
            }
        }
    }

    #[cfg(not(unix))]
    let _ = dir;
}
