//! Supervisor module: runs Unity under the log watcher and decides the verdict.

mod artifacts;
mod runner;
mod verdict;

pub use artifacts::*;
pub use runner::*;
pub use verdict::*;
