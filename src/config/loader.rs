//! Locating and reading `unity-proxy` configuration.

use std::path::{Path, PathBuf};

use super::ProxyConfig;

/// Environment variable naming a config file.
pub const CONFIG_ENV: &str = "UNITY_PROXY_CONFIG";

/// File name looked up in the working directory.
pub const PROJECT_CONFIG: &str = ".unity-proxy.toml";

/// Where a config file may come from.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Source {
    /// Named on the command line or in [`CONFIG_ENV`]; must exist.
    Explicit(PathBuf),
    /// Project then user locations; absent files are skipped.
    Search(Vec<PathBuf>),
}

/// Resolves and parses the proxy configuration.
#[derive(Debug)]
pub struct ConfigLoader {
    source: Source,
}

impl ConfigLoader {
    /// Loader honouring [`CONFIG_ENV`], falling back to the search path
    /// `./.unity-proxy.toml`, then `<config dir>/unity-proxy/config.toml`.
    #[must_use]
    pub fn new() -> Self {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) if !path.is_empty() => Self::with_path(PathBuf::from(path)),
            _ => Self::search(),
        }
    }

    /// Loader for a file the user asked for by name.
    #[must_use]
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            source: Source::Explicit(path),
        }
    }

    fn search() -> Self {
        let mut candidates = vec![PathBuf::from(PROJECT_CONFIG)];
        if let Some(dir) = dirs::config_dir() {
            candidates.push(dir.join("unity-proxy").join("config.toml"));
        }
        Self {
            source: Source::Search(candidates),
        }
    }

    /// Candidate files in lookup order.
    #[must_use]
    pub fn search_paths(&self) -> &[PathBuf] {
        match &self.source {
            Source::Explicit(path) => std::slice::from_ref(path),
            Source::Search(paths) => paths,
        }
    }

    /// The file [`load`](Self::load) would read, if any.
    #[must_use]
    pub fn find_config_file(&self) -> Option<PathBuf> {
        match &self.source {
            Source::Explicit(path) => Some(path.clone()),
            Source::Search(paths) => paths.iter().find(|p| p.is_file()).cloned(),
        }
    }

    /// Read the configuration.
    ///
    /// Without any config file the defaults apply.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicitly named file is missing or unreadable,
    /// or if the chosen file is not valid TOML for [`ProxyConfig`].
    pub fn load(&self) -> Result<ProxyConfig, ConfigError> {
        let Some(path) = self.find_config_file() else {
            tracing::debug!(
                searched = ?self.search_paths(),
                "No config file found, using defaults"
            );
            return Ok(ProxyConfig::default());
        };

        tracing::debug!(path = %path.display(), "Loading config file");
        let config = parse_file(&path)?;
        if config.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                path,
                reason: "poll_interval_ms must be greater than zero".to_string(),
            });
        }
        Ok(config)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_file(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::ParseError {
        path: path.to_path_buf(),
        source,
    })
}

/// Errors that can occur during configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid config file {path}: {reason}")]
    Invalid { path: PathBuf, reason: String },
}
