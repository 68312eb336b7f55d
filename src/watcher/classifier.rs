//! Line classification for Unity log output.
//!
//! Maps a single log line to at most one semantic [`Signal`]. Classification
//! is pure: it never fails and has no side effects.

use serde::{Deserialize, Serialize};

/// Prefix Unity writes when it shows a progress bar.
pub const PROGRESS_PREFIX: &str = "DisplayProgressbar: ";

/// Substring our build pipeline writes when the build fails.
pub const FAILURE_MARKER: &str = "Build failure!";

/// Substring of compiler and editor error lines.
pub const ERROR_MARKER: &str = "ERROR:";

/// Semantic meaning of one log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    /// Nothing of interest.
    Plain,
    /// A named long-running step started.
    Progress {
        /// Progress bar title.
        name: String,
    },
    /// An error line.
    ErrorMarker {
        /// Trimmed text after the error marker.
        text: String,
    },
    /// An explicit build failure line.
    FailureMarker {
        /// Trimmed text after the failure marker.
        text: String,
    },
}

impl Signal {
    /// Returns true for error and failure markers.
    #[must_use]
    pub fn is_problem(&self) -> bool {
        matches!(self, Self::ErrorMarker { .. } | Self::FailureMarker { .. })
    }
}

/// Marker strings recognised in the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Markers {
    /// Line prefix of progress bar messages.
    pub progress_prefix: String,
    /// Substring marking a build failure.
    pub failure: String,
    /// Substring marking an error.
    pub error: String,
}

impl Default for Markers {
    fn default() -> Self {
        Self {
            progress_prefix: PROGRESS_PREFIX.to_string(),
            failure: FAILURE_MARKER.to_string(),
            error: ERROR_MARKER.to_string(),
        }
    }
}

/// Classifies log lines by marker.
#[derive(Debug, Clone, Default)]
pub struct LineClassifier {
    markers: Markers,
}

impl LineClassifier {
    /// Create a classifier with the default Unity markers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a classifier with custom markers.
    #[must_use]
    pub fn with_markers(markers: Markers) -> Self {
        Self { markers }
    }

    /// Get the markers in use.
    #[must_use]
    pub fn markers(&self) -> &Markers {
        &self.markers
    }

    /// Classify a single line (without its terminator).
    ///
    /// Priority: progress prefix, then failure marker, then error marker.
    #[must_use]
    pub fn classify(&self, line: &str) -> Signal {
        if !self.markers.progress_prefix.is_empty() {
            if let Some(name) = line.strip_prefix(self.markers.progress_prefix.as_str()) {
                return Signal::Progress {
                    name: name.to_string(),
                };
            }
        }

        if let Some(text) = text_after(line, &self.markers.failure) {
            return Signal::FailureMarker { text };
        }

        if let Some(text) = text_after(line, &self.markers.error) {
            return Signal::ErrorMarker { text };
        }

        Signal::Plain
    }
}

/// Trimmed remainder of `line` after the first occurrence of `marker`.
fn text_after(line: &str, marker: &str) -> Option<String> {
    if marker.is_empty() {
        return None;
    }
    line.find(marker)
        .map(|idx| line[idx + marker.len()..].trim().to_string())
}
