//! Unity Proxy - runs Unity in batch mode and reports the build to TeamCity.

pub mod config;
pub mod display;
pub mod status;
pub mod supervisor;
pub mod unity;
pub mod watcher;
