//! Incremental log file tailer.
//!
//! Reads bytes appended to the Unity log since the last poll, mirrors them
//! into the full log, and feeds complete lines through the classifier.

use std::io::{ErrorKind, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use crate::status::{StatusEvent, StatusSink};

use super::decoder::Utf8Decoder;
use super::error::WatcherError;
use super::failure::{FailureAccumulator, FailureState};
use super::lines::LineAssembler;
use super::{LineClassifier, Signal, WatchReport};

/// Incremental reader for a log file that another process is writing.
///
/// The read offset belongs to the instance, so several tailers can run
/// side by side.
pub struct LogTailer {
    /// Path to the log file.
    path: PathBuf,
    /// Bytes consumed so far.
    offset: u64,
    decoder: Utf8Decoder,
    lines: LineAssembler,
    /// Every decoded chunk, in read order.
    full_log: String,
    classifier: LineClassifier,
    failures: FailureAccumulator,
    sink: Arc<dyn StatusSink>,
}

impl LogTailer {
    /// Create a new tailer for the given path, starting at offset 0.
    #[must_use]
    pub fn new(path: PathBuf, classifier: LineClassifier, sink: Arc<dyn StatusSink>) -> Self {
        Self {
            path,
            offset: 0,
            decoder: Utf8Decoder::new(),
            lines: LineAssembler::new(),
            full_log: String::new(),
            classifier,
            failures: FailureAccumulator::new(),
            sink,
        }
    }

    /// Get the path being tailed.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the current byte offset.
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Everything read so far.
    #[must_use]
    pub fn full_log(&self) -> &str {
        &self.full_log
    }

    /// Failure state accumulated so far.
    #[must_use]
    pub fn failure(&self) -> &FailureState {
        self.failures.state()
    }

    /// Read and process everything appended since the last poll.
    ///
    /// Returns the newly decoded text, which is empty if the file does not
    /// exist yet, has not grown, or is temporarily locked.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read, or if the new
    /// bytes are not valid UTF-8. The offset has already moved past the
    /// failed range in that case.
    pub async fn poll_once(&mut self) -> Result<String, WatcherError> {
        let text = self.read_and_decode().await?;
        self.full_log.push_str(&text);
        let batch = self.lines.push(&text);
        self.classify_batch(&batch);
        Ok(text)
    }

    /// Last poll of a run: read what is left, then flush a partial UTF-8
    /// sequence and the unterminated last line.
    ///
    /// Everything read here is classified as one batch, so a failure marker
    /// on the unterminated line still beats an earlier error line.
    ///
    /// # Errors
    ///
    /// Same as [`poll_once`](Self::poll_once).
    pub async fn poll_final(&mut self) -> Result<String, WatcherError> {
        let mut text = self.read_and_decode().await?;

        let tail = self.decoder.finish();
        if !tail.is_empty() {
            tracing::warn!(
                path = %self.path.display(),
                "Log ends inside a UTF-8 sequence, replacing incomplete bytes"
            );
            text.push_str(&tail);
        }
        self.full_log.push_str(&text);

        let mut batch = self.lines.push(&text);
        batch.extend(self.lines.finish());
        self.classify_batch(&batch);

        Ok(text)
    }

    /// Consume the tailer, keeping what the supervisor needs.
    #[must_use]
    pub fn into_report(self) -> WatchReport {
        WatchReport {
            bytes_read: self.offset,
            full_log: self.full_log,
            failure: self.failures.into_state(),
        }
    }

    async fn read_and_decode(&mut self) -> Result<String, WatcherError> {
        let Some(bytes) = self.read_new_bytes().await? else {
            return Ok(String::new());
        };

        let chunk_start = self.offset - bytes.len() as u64;
        let carried = self.decoder.pending_len() as u64;
        self.decoder
            .decode(&bytes)
            .map_err(|e| WatcherError::Decode {
                path: self.path.clone(),
                offset: chunk_start - carried + e.offset as u64,
            })
    }

    async fn read_new_bytes(&mut self) -> Result<Option<Vec<u8>>, WatcherError> {
        let mut file = match open_shared(&self.path).await {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) if is_transient(&e) => {
                tracing::debug!(
                    path = %self.path.display(),
                    error = %e,
                    "Log file busy, retrying on next poll"
                );
                return Ok(None);
            }
            Err(e) if e.kind() == ErrorKind::PermissionDenied => {
                return Err(WatcherError::PermissionDenied(self.path.clone()));
            }
            Err(e) => return Err(WatcherError::Io(e)),
        };

        let file_len = file.metadata().await?.len();

        if file_len < self.offset {
            tracing::warn!(
                path = %self.path.display(),
                old_offset = self.offset,
                new_len = file_len,
                "Log file shrank, tailing it again from the start"
            );
            self.restart();
        }

        if file_len == self.offset {
            return Ok(None);
        }

        file.seek(SeekFrom::Start(self.offset)).await?;
        let mut bytes = Vec::with_capacity(usize::try_from(file_len - self.offset).unwrap_or(0));
        file.read_to_end(&mut bytes).await?;

        // Claim the range before anything downstream can fail.
        self.offset += bytes.len() as u64;

        tracing::trace!(
            path = %self.path.display(),
            bytes = bytes.len(),
            offset = self.offset,
            "Read log chunk"
        );

        Ok(Some(bytes))
    }

    fn classify_batch(&mut self, lines: &[String]) {
        let mut problems = Vec::new();
        for line in lines {
            match self.classifier.classify(line) {
                Signal::Progress { name } => self.sink.emit(StatusEvent::Progress { name }),
                signal if signal.is_problem() => problems.push(signal),
                _ => {}
            }
        }

        self.failures.observe(&problems, self.sink.as_ref());
    }

    /// Start over on a replaced or truncated file.
    fn restart(&mut self) {
        self.offset = 0;
        self.decoder.reset();
        self.lines.reset();
    }
}

/// Open for reading while the writer keeps the file open for writing.
async fn open_shared(path: &Path) -> std::io::Result<File> {
    let mut options = OpenOptions::new();
    options.read(true);

    #[cfg(windows)]
    {
        // FILE_SHARE_READ | FILE_SHARE_WRITE | FILE_SHARE_DELETE
        options.share_mode(0x1 | 0x2 | 0x4);
    }

    options.open(path).await
}

/// Errors worth retrying on the next poll.
fn is_transient(err: &std::io::Error) -> bool {
    if err.kind() == ErrorKind::WouldBlock {
        return true;
    }
    // ERROR_SHARING_VIOLATION, ERROR_LOCK_VIOLATION
    cfg!(windows) && matches!(err.raw_os_error(), Some(32 | 33))
}
