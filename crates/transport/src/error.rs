//! Transport error types

use thiserror::Error;

/// Errors that can occur when launching or talking to a capture child
#[derive(Debug, Error)]
pub enum TransportError {
    /// The binary was not found in any allowed search path
    #[error("capture binary '{name}' not found in allowed paths [{searched}]")]
    BinaryNotFound { name: String, searched: String },

    /// The binary name tried to escape the allow-list
    #[error("capture binary '{name}' must be a bare name, not a path")]
    PathQualifiedName { name: String },

    /// The child process failed to start
    #[error("failed to launch '{binary}': {source}")]
    LaunchFailed {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    /// The write queue is full - nothing was enqueued
    #[error("transport write queue full")]
    WriteQueueFull,

    /// The transport has been closed
    #[error("transport closed")]
    Closed,
}

impl TransportError {
    /// Create a BinaryNotFound error from the searched path list
    pub fn not_found(name: impl Into<String>, paths: &[std::path::PathBuf]) -> Self {
        Self::BinaryNotFound {
            name: name.into(),
            searched: paths
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}
