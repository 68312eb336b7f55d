//! TeamCity service message rendering.
//!
//! See <https://www.jetbrains.com/help/teamcity/service-messages.html>.

use std::io::{self, Write};
use std::sync::{Mutex, PoisonError};

use crate::display;

use super::{StatusEvent, StatusSink};

/// Escape a value for use inside a service message attribute.
#[must_use]
pub fn escape_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '|' => out.push_str("||"),
            '\'' => out.push_str("|'"),
            '\n' => out.push_str("|n"),
            '\r' => out.push_str("|r"),
            '[' => out.push_str("|["),
            ']' => out.push_str("|]"),
            _ => out.push(ch),
        }
    }
    out
}

/// Render an event as the line TeamCity expects, without a trailing newline.
#[must_use]
pub fn render(event: &StatusEvent, color: bool) -> String {
    match event {
        StatusEvent::Progress { name } => {
            format!("##teamcity[progressMessage '{}']", escape_value(name))
        }
        StatusEvent::BuildProblem { description } => format!(
            "##teamcity[buildProblem description='{}']",
            escape_value(description)
        ),
        StatusEvent::SetParameter { name, value } => format!(
            "##teamcity[setParameter name='{}' value='{}']",
            escape_value(name),
            escape_value(value)
        ),
        StatusEvent::Finished { ok } => display::summary_line(*ok, color),
    }
}

struct Inner<W> {
    writer: W,
    at_line_start: bool,
}

/// Writes the log mirror and service messages to a single stream.
///
/// Service messages are only recognised at the start of a line, so a
/// newline is inserted when the mirrored log stopped mid-line.
pub struct TeamCitySink<W: Write + Send> {
    inner: Mutex<Inner<W>>,
    color: bool,
}

impl TeamCitySink<io::Stdout> {
    /// Sink writing to the process stdout.
    #[must_use]
    pub fn stdout(color: bool) -> Self {
        Self::new(io::stdout(), color)
    }
}

impl<W: Write + Send> TeamCitySink<W> {
    #[must_use]
    pub fn new(writer: W, color: bool) -> Self {
        Self {
            inner: Mutex::new(Inner {
                writer,
                at_line_start: true,
            }),
            color,
        }
    }

    /// Recover the underlying writer.
    pub fn into_inner(self) -> W {
        self.inner
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
            .writer
    }

    fn write_with(&self, f: impl FnOnce(&mut Inner<W>) -> io::Result<()>) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = f(&mut inner).and_then(|()| inner.writer.flush()) {
            tracing::warn!(error = %e, "Failed to write status output");
        }
    }
}

impl<W: Write + Send> StatusSink for TeamCitySink<W> {
    fn log_output(&self, text: &str) {
        if text.is_empty() {
            return;
        }
        self.write_with(|inner| {
            inner.writer.write_all(text.as_bytes())?;
            inner.at_line_start = text.ends_with('\n') || text.ends_with('\r');
            Ok(())
        });
    }

    fn emit(&self, event: StatusEvent) {
        let line = render(&event, self.color);
        self.write_with(|inner| {
            if !inner.at_line_start {
                inner.writer.write_all(b"\n")?;
            }
            writeln!(inner.writer, "{line}")?;
            inner.at_line_start = true;
            Ok(())
        });
    }
}
