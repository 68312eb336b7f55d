//! Console display helpers.
//!
//! Formatting for the lines the proxy itself prints around the mirrored
//! Unity log.

use std::borrow::Cow;
use std::path::Path;

use chrono::Utc;
use owo_colors::OwoColorize;

/// Get current timestamp in the same format as tracing.
fn timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

/// Quote arguments for display the way a POSIX shell would need them.
#[must_use]
pub fn quote_args(args: &[String]) -> String {
    args.iter()
        .map(|arg| shell_escape::escape(Cow::Borrowed(arg.as_str())))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Banner printed before Unity is launched.
#[must_use]
pub fn launch_line(binary: &Path, args: &[String]) -> String {
    format!(
        "{} [unity-proxy] {} Starting Unity with arguments: {}",
        timestamp(),
        binary.display(),
        quote_args(args)
    )
}

/// One-line run summary.
#[must_use]
pub fn summary_line(ok: bool, color: bool) -> String {
    match (ok, color) {
        (true, false) => "Success.".to_string(),
        (false, false) => "Failure.".to_string(),
        (true, true) => "Success.".green().bold().to_string(),
        (false, true) => "Failure.".red().bold().to_string(),
    }
}
