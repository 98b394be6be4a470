//! Errors produced while loading the configuration document.

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by [`ConfigSingleton`](super::ConfigSingleton).
///
/// None of these is remembered: the singleton stays unloaded and the next
/// access reads the document again.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed configuration in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid configuration in {}: {reason}", path.display())]
    Validation { path: PathBuf, reason: String },
}

impl ConfigError {
    /// Path of the document the error refers to.
    pub fn path(&self) -> &std::path::Path {
        match self {
            ConfigError::NotFound { path }
            | ConfigError::Io { path, .. }
            | ConfigError::Parse { path, .. }
            | ConfigError::Validation { path, .. } => path,
        }
    }
}
