//! Error types for the converge engine

use thiserror::Error;

/// Result type alias for converge operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the converge engine
///
/// Only `Config` and `NoGroupsSelected` ever cross the orchestrator boundary.
/// The remaining variants exist for [`Generator`](crate::Generator)
/// implementations; the engine folds them into low-confidence data at the
/// worker and synthesizer seams.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid engine configuration, raised at construction time
    #[error("Configuration error: {0}")]
    Config(String),

    /// The router selected zero groups for this command
    #[error("No groups selected for command {0:?}")]
    NoGroupsSelected(Option<String>),

    /// Generator capability failure
    #[error("Generator error: {0}")]
    Generator(String),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Operation timed out
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a generator error
    pub fn generator(msg: impl Into<String>) -> Self {
        Self::Generator(msg.into())
    }

    /// Create a timeout error
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// Create an other error
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}
