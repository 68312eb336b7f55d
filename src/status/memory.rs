//! In-memory status sink.

use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{StatusEvent, StatusSink};

/// Records everything it receives. Useful for tests and embedding.
#[derive(Debug, Default)]
pub struct MemorySink {
    output: Mutex<String>,
    events: Mutex<Vec<StatusEvent>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All mirrored log text, concatenated.
    #[must_use]
    pub fn output(&self) -> String {
        lock(&self.output).clone()
    }

    /// All events in emission order.
    #[must_use]
    pub fn events(&self) -> Vec<StatusEvent> {
        lock(&self.events).clone()
    }

    /// Names of all progress events.
    #[must_use]
    pub fn progress_names(&self) -> Vec<String> {
        lock(&self.events)
            .iter()
            .filter_map(|event| match event {
                StatusEvent::Progress { name } => Some(name.clone()),
                _ => None,
            })
            .collect()
    }

    /// Descriptions of all build problems.
    #[must_use]
    pub fn problems(&self) -> Vec<String> {
        lock(&self.events)
            .iter()
            .filter_map(|event| match event {
                StatusEvent::BuildProblem { description } => Some(description.clone()),
                _ => None,
            })
            .collect()
    }
}

impl StatusSink for MemorySink {
    fn log_output(&self, text: &str) {
        lock(&self.output).push_str(text);
    }

    fn emit(&self, event: StatusEvent) {
        lock(&self.events).push(event);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
