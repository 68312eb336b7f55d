//! Failure latch over classified log lines.

use crate::status::{StatusEvent, StatusSink};

use super::Signal;

/// Latched failure state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FailureState {
    reason: Option<String>,
}

impl FailureState {
    /// Whether a failure was detected.
    #[must_use]
    pub fn failed(&self) -> bool {
        self.reason.is_some()
    }

    /// Text of the first detected failure, if any.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }
}

/// Latches the first failure seen across all batches.
///
/// Within a batch, any failure marker beats any error marker regardless of
/// line order. Once latched, the state never changes.
#[derive(Debug, Default)]
pub struct FailureAccumulator {
    state: FailureState,
}

impl FailureAccumulator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> &FailureState {
        &self.state
    }

    /// Consume the accumulator.
    #[must_use]
    pub fn into_state(self) -> FailureState {
        self.state
    }

    /// Observe one batch of signals, reporting a build problem on the
    /// batch that latches.
    ///
    /// Returns true if this call latched the failure.
    pub fn observe(&mut self, signals: &[Signal], sink: &dyn StatusSink) -> bool {
        if self.state.failed() {
            return false;
        }

        let failure = signals.iter().find_map(|signal| match signal {
            Signal::FailureMarker { text } => Some(text),
            _ => None,
        });
        let reason = failure.or_else(|| {
            signals.iter().find_map(|signal| match signal {
                Signal::ErrorMarker { text } => Some(text),
                _ => None,
            })
        });

        let Some(reason) = reason else {
            return false;
        };

        tracing::info!(reason = %reason, "Build failure detected");
        self.state.reason = Some(reason.clone());
        sink.emit(StatusEvent::BuildProblem {
            description: reason.clone(),
        });
        true
    }
}
