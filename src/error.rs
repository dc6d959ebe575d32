//! Error types for hotswap-ini.

use std::time::Duration;

/// Result type alias for hotswap-ini operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur when working with configuration.
///
/// Most of the library absorbs failures and keeps serving the last good
/// state. The shutdown variants are the exception: callers should treat them
/// as fatal.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to load a configuration or settings source.
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    /// IO error occurred.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// The poll task did not stop before the shutdown timeout elapsed.
    #[error("Monitor shutdown timed out after {0:?}")]
    ShutdownTimeout(Duration),

    /// The poll task terminated abnormally while shutting down.
    #[error("Monitor shutdown failed: {0}")]
    ShutdownFailed(String),
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}
