use thiserror::Error;

/// Crate-wide error type.
///
/// Only collaborator faults surface here: a fetch boundary call that fails as
/// a whole, or identity storage I/O. Malformed profile content, bad query
/// parameters and stale profile records are recovered locally (logged and
/// treated as absent) and never become an `AppError`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::SerializationError(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
