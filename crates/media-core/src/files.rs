//! File-store primitives used by the consistency engine.
//!
//! The engine only ever moves, deletes, and probes files, so the store is
//! reduced to those calls behind [`MediaFileOps`]. Errors stay as plain
//! `io::Error`; the caller attaches phase and asset context.

use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, warn};

/// File-store operations needed by the media engine.
pub trait MediaFileOps: Send + Sync {
    /// Whether anything exists at `path`.
    fn exists(&self, path: &Path) -> bool;

    /// Whether `path` is an existing directory.
    fn is_dir(&self, path: &Path) -> bool;

    /// Whether `path` is an existing regular file.
    fn is_file(&self, path: &Path) -> bool;

    /// Create a directory and any missing parents.
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Move a file. The destination must not exist.
    fn move_file(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Remove a file.
    fn remove_file(&self, path: &Path) -> io::Result<()>;
}

/// [`MediaFileOps`] on the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileOps;

impl MediaFileOps for LocalFileOps {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    /// Rename, falling back to copy+delete when the rename fails
    /// (e.g. the upload temp dir is on another filesystem).
    fn move_file(&self, from: &Path, to: &Path) -> io::Result<()> {
        if to.exists() {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("destination {} already exists", to.display()),
            ));
        }

        match fs::rename(from, to) {
            Ok(()) => {
                debug!("Moved {} -> {}", from.display(), to.display());
                Ok(())
            }
            Err(rename_err) => {
                if !from.is_file() {
                    return Err(rename_err);
                }
                debug!(
                    "Rename {} -> {} failed ({}), copying instead",
                    from.display(),
                    to.display(),
                    rename_err
                );
                if let Err(e) = fs::copy(from, to) {
                    let _ = fs::remove_file(to);
                    return Err(e);
                }
                if let Err(e) = fs::remove_file(from) {
                    warn!("Copied {} but could not remove it: {}", from.display(), e);
                }
                Ok(())
            }
        }
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }
}

/// Remove a file, treating "already gone" as success.
pub fn remove_if_present(files: &dyn MediaFileOps, path: &Path) -> io::Result<bool> {
    match files.remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}
