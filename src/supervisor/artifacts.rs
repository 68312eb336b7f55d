//! Build artifact output.

use std::path::{Path, PathBuf};

/// Write the full log into `dir`, creating the directory if needed.
///
/// # Errors
///
/// Returns an error if the directory or file cannot be written.
pub async fn save_log(dir: &Path, file_name: &str, full_log: &str) -> std::io::Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(file_name);
    tokio::fs::write(&path, full_log).await?;
    tracing::info!(path = %path.display(), bytes = full_log.len(), "Saved log artifact");
    Ok(path)
}
