//! Polling driver for the log tailer.
//!
//! The loop runs as its own tokio task. It polls the tailer on a fixed
//! interval and mirrors new text to the status sink until it is asked to
//! stop, then drains the file one last time.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::status::StatusSink;

use super::error::WatcherError;
use super::failure::FailureState;
use super::tailer::LogTailer;

/// Default delay between polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Lifecycle of a watch loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    Running,
    Stopping,
    Stopped,
}

/// What the loop hands back when it is done.
#[derive(Debug, Clone)]
pub struct WatchReport {
    /// The complete log text.
    pub full_log: String,
    /// Failure latched while tailing.
    pub failure: FailureState,
    /// Bytes consumed from the current file.
    pub bytes_read: u64,
}

/// Polls a [`LogTailer`] until stopped.
pub struct WatchLoop {
    tailer: LogTailer,
    sink: Arc<dyn StatusSink>,
    interval: Duration,
    state: WatchState,
}

impl WatchLoop {
    #[must_use]
    pub fn new(tailer: LogTailer, sink: Arc<dyn StatusSink>, interval: Duration) -> Self {
        Self {
            tailer,
            sink,
            interval,
            state: WatchState::Running,
        }
    }

    #[must_use]
    pub fn state(&self) -> WatchState {
        self.state
    }

    /// Run until `stop` is cancelled, then drain once more.
    ///
    /// # Errors
    ///
    /// Returns the first tailer error. The loop does not retry.
    pub async fn run(mut self, stop: CancellationToken) -> Result<WatchReport, WatcherError> {
        loop {
            if stop.is_cancelled() {
                break;
            }

            self.poll().await?;

            tokio::select! {
                () = tokio::time::sleep(self.interval) => {}
                () = stop.cancelled() => {}
            }
        }

        self.transition(WatchState::Stopping);
        self.poll().await?;
        self.transition(WatchState::Stopped);

        Ok(self.tailer.into_report())
    }

    /// Run the loop on a new tokio task.
    #[must_use]
    pub fn spawn(self) -> WatchHandle {
        let stop = CancellationToken::new();
        let done = CancellationToken::new();

        let token = stop.clone();
        let guard = done.clone().drop_guard();
        let task = tokio::spawn(async move {
            let _guard = guard;
            self.run(token).await
        });

        WatchHandle { stop, done, task }
    }

    async fn poll(&mut self) -> Result<(), WatcherError> {
        let polled = if self.state == WatchState::Stopping {
            self.tailer.poll_final().await
        } else {
            self.tailer.poll_once().await
        };

        match polled {
            Ok(text) => {
                self.mirror(&text);
                Ok(())
            }
            Err(e) => {
                tracing::error!(
                    path = %self.tailer.path().display(),
                    error = %e,
                    "Log watcher stopped"
                );
                self.transition(WatchState::Stopped);
                Err(e)
            }
        }
    }

    fn mirror(&self, text: &str) {
        if !text.is_empty() {
            self.sink.log_output(text);
        }
    }

    fn transition(&mut self, next: WatchState) {
        tracing::debug!(from = ?self.state, to = ?next, "Watch loop transition");
        self.state = next;
    }
}

/// Control handle for a spawned [`WatchLoop`].
#[derive(Debug)]
pub struct WatchHandle {
    stop: CancellationToken,
    done: CancellationToken,
    task: JoinHandle<Result<WatchReport, WatcherError>>,
}

impl WatchHandle {
    /// Ask the loop to stop. Returns immediately; the final drain happens
    /// on the loop's task, so call [`join`](Self::join) to wait for it.
    pub fn stop(&self) {
        self.stop.cancel();
    }

    /// Whether [`stop`](Self::stop) has been called.
    #[must_use]
    pub fn is_stopping(&self) -> bool {
        self.stop.is_cancelled()
    }

    /// Resolves once the loop task has exited, for whatever reason.
    pub async fn terminated(&self) {
        self.done.cancelled().await;
    }

    /// Wait for the loop to finish and take its report.
    ///
    /// # Errors
    ///
    /// Returns the error that ended the loop, or [`WatcherError::Join`] if
    /// the task panicked.
    pub async fn join(self) -> Result<WatchReport, WatcherError> {
        self.task.await?
    }
}
