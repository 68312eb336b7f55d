//! Watcher module for the Unity log file.
//!
//! Tails the log while Unity writes it, classifies lines into progress and
//! failure signals, and keeps the full text for the final verdict.

mod classifier;
mod decoder;
mod error;
mod failure;
mod lines;
mod tailer;
mod watch_loop;

pub use classifier::{
    LineClassifier, Markers, Signal, ERROR_MARKER, FAILURE_MARKER, PROGRESS_PREFIX,
};
pub use decoder::{InvalidUtf8, Utf8Decoder};
pub use error::WatcherError;
pub use failure::{FailureAccumulator, FailureState};
pub use lines::LineAssembler;
pub use tailer::LogTailer;
pub use watch_loop::{WatchHandle, WatchLoop, WatchReport, WatchState, DEFAULT_POLL_INTERVAL};
