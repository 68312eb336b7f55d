//! Configuration types.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::watcher::Markers;

/// Magic string our build pipeline writes to the log after a successful build.
pub const SUCCESS_MARKER: &str = "Exiting batchmode successfully now!";

/// Configuration for a proxied Unity run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Text that must appear in the log for the run to succeed.
    #[serde(default = "default_success_marker")]
    pub success_marker: String,
    /// Delay between log polls, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Grace period before Unity is killed when the watcher fails.
    #[serde(default = "default_terminate_timeout_secs")]
    pub terminate_timeout_secs: u64,
    /// File name of the log copy in the artifacts directory.
    #[serde(default = "default_artifact_log_name")]
    pub artifact_log_name: String,
    /// Color the summary line.
    #[serde(default)]
    pub color: bool,
    /// Log markers.
    #[serde(default)]
    pub markers: Markers,
}

fn default_success_marker() -> String {
    SUCCESS_MARKER.to_string()
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_terminate_timeout_secs() -> u64 {
    5
}

fn default_artifact_log_name() -> String {
    "editor.log".to_string()
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            success_marker: default_success_marker(),
            poll_interval_ms: default_poll_interval_ms(),
            terminate_timeout_secs: default_terminate_timeout_secs(),
            artifact_log_name: default_artifact_log_name(),
            color: false,
            markers: Markers::default(),
        }
    }
}

impl ProxyConfig {
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    #[must_use]
    pub fn terminate_timeout(&self) -> Duration {
        Duration::from_secs(self.terminate_timeout_secs)
    }
}
