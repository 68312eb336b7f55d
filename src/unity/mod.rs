//! The Unity editor as a child process.

mod process;

pub use process::*;
