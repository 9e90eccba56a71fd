//! Error types for the thread registry and thread controls.

use thiserror::Error;

/// Errors raised by registry lookups, registration and thread controls.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ThreadError {
    /// A thread with this name is already registered.
    #[error("a thread named '{0}' is already registered")]
    DuplicateName(String),

    /// No thread is registered under this name.
    #[error("no thread named '{0}' is registered")]
    NotFound(String),

    /// An argument was out of range (e.g. a negative wait).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Result type for registry and thread operations.
pub type Result<T> = std::result::Result<T, ThreadError>;
