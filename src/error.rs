use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, PackError>;

/// The primary error type for all operations in the `treepack` crate.
///
/// Every variant carries the path that was being processed so the first
/// failure can be diagnosed without looking at the partial snapshot.
#[derive(Debug, Error)]
pub enum PackError {
    /// The source root is missing, unreadable or not a directory.
    #[error("source root '{}' is not a readable directory: {source}", path.display())]
    SourceRoot { source: io::Error, path: PathBuf },

    /// The directory iterator failed to enumerate or stat an object.
    #[error("failed to walk '{}': {source}", path.display())]
    Walk { source: io::Error, path: PathBuf },

    /// A visited object could not be expressed relative to the source root.
    #[error("could not resolve '{}' relative to '{}'", path.display(), root.display())]
    PathResolution { root: PathBuf, path: PathBuf },

    /// Reading the target text of a symbolic link failed.
    #[error("failed to read symlink '{}': {source}", path.display())]
    SymlinkRead { source: io::Error, path: PathBuf },

    /// A regular file could not be opened for reading.
    #[error("failed to open '{}': {source}", path.display())]
    FileOpen { source: io::Error, path: PathBuf },

    /// Reading a regular file's payload failed mid-copy.
    #[error("failed to read '{}': {source}", path.display())]
    FileRead { source: io::Error, path: PathBuf },

    /// The payload length diverged from the size recorded in the header.
    #[error("size mismatch for '{}': header declares {expected} bytes, source yielded {actual}", path.display())]
    SizeMismatch {
        path: PathBuf,
        expected: u64,
        /// Bytes actually available; `expected + 1` means "more than declared".
        actual: u64,
    },

    /// The downstream sink rejected a write while encoding an entry.
    #[error("failed to write entry '{}': {source}", path.display())]
    Write { source: io::Error, path: PathBuf },

    /// Writing the end-of-archive marker or the compression trailer failed.
    #[error("failed to finalize {stage}: {source}")]
    Finalization {
        source: io::Error,
        stage: &'static str,
    },

    /// The destination already exists and holds data.
    #[error("destination '{}' already exists and is not empty ({size} bytes)", path.display())]
    DestinationNotEmpty { path: PathBuf, size: u64 },

    /// The destination could not be created or opened.
    #[error("failed to open destination '{}': {source}", path.display())]
    Destination { source: io::Error, path: PathBuf },

    /// A snapshot could not be decoded while listing it.
    #[error("failed to read snapshot: {source}")]
    ArchiveRead { source: io::Error },
}

impl PackError {
    /// Path the error refers to, when there is one.
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            PackError::SourceRoot { path, .. }
            | PackError::Walk { path, .. }
            | PackError::PathResolution { path, .. }
            | PackError::SymlinkRead { path, .. }
            | PackError::FileOpen { path, .. }
            | PackError::FileRead { path, .. }
            | PackError::SizeMismatch { path, .. }
            | PackError::Write { path, .. }
            | PackError::DestinationNotEmpty { path, .. }
            | PackError::Destination { path, .. } => Some(path),
            PackError::Finalization { .. } | PackError::ArchiveRead { .. } => None,
        }
    }
}

impl From<walkdir::Error> for PackError {
    fn from(err: walkdir::Error) -> Self {
        let path = err.path().map(PathBuf::from).unwrap_or_default();
        let source = match err.into_io_error() {
            Some(e) => e,
            None => io::Error::new(io::ErrorKind::Other, "filesystem loop detected"),
        };
        PackError::Walk { source, path }
    }
}
