//! Error types for auditkit.

use thiserror::Error;

/// Result type alias for auditkit operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in auditkit operations.
#[derive(Error, Debug)]
pub enum Error {
    // Lifecycle errors
    #[error("Audit manager is already running")]
    AlreadyRunning,

    #[error("Audit manager is not running")]
    NotRunning,

    #[error("Dispatch queue closed")]
    QueueClosed,

    // Configuration errors
    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    // Pipeline errors
    #[error("Layout error: {0}")]
    Layout(String),

    #[error("Handler {handler} failed: {message}")]
    Handler { handler: String, message: String },

    // Serialization errors
    #[error("Serialization error: {0}")]
    SerializationError(String),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Build a handler error.
    pub fn handler(handler: &str, message: impl std::fmt::Display) -> Self {
        Error::Handler {
            handler: handler.to_string(),
            message: message.to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::SerializationError(err.to_string())
    }
}
