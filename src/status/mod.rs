//! Status reporting towards the build server.
//!
//! The watcher and supervisor never write to stdout directly; they talk to
//! a [`StatusSink`] which decides how events are rendered.

mod memory;
mod teamcity;

pub use memory::MemorySink;
pub use teamcity::{escape_value, render, TeamCitySink};

/// Logical events reported to the build server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusEvent {
    /// A named build step started.
    Progress {
        /// Step name.
        name: String,
    },
    /// The build reported a problem.
    BuildProblem {
        /// Problem description.
        description: String,
    },
    /// Publish a build parameter.
    SetParameter {
        /// Parameter name.
        name: String,
        /// Parameter value.
        value: String,
    },
    /// The run is over.
    Finished {
        /// Overall verdict.
        ok: bool,
    },
}

/// Receiver of the console mirror and status events.
pub trait StatusSink: Send + Sync {
    /// Mirror raw log text to the console.
    fn log_output(&self, text: &str);

    /// Report a status event.
    fn emit(&self, event: StatusEvent);
}
