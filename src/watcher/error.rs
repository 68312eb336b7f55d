//! Watcher error types.

use std::path::PathBuf;

/// Errors that stop the watch loop.
///
/// A missing log file is not an error: the child may not have created it yet.
#[derive(thiserror::Error, Debug)]
pub enum WatcherError {
    /// Permission denied accessing the log file.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// Log bytes are not valid UTF-8.
    #[error("Invalid UTF-8 in {path} near byte {offset}")]
    Decode {
        /// Log file path.
        path: PathBuf,
        /// Absolute file offset of the first invalid byte.
        offset: u64,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The watch task panicked or was aborted.
    #[error("Watch task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
