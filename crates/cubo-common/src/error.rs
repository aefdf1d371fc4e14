//! Error types for the cubo workspace.

use thiserror::Error;

/// Result type alias using CuboError.
pub type CuboResult<T> = Result<T, CuboError>;

/// Primary error type for cube geometry and retrieval.
#[derive(Debug, Error)]
pub enum CuboError {
    // === Caller Errors ===
    #[error("Invalid parameter value for '{param}': {message}")]
    InvalidParameter { param: String, message: String },

    #[error("Unknown unit: {0}")]
    UnknownUnit(String),

    #[error("Invalid date specification: {0}")]
    InvalidDate(String),

    // === Geometry Errors ===
    #[error("Projection error: {0}")]
    Projection(String),

    // === Retrieval Errors ===
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Collection error: {0}")]
    Collection(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl CuboError {
    /// Shorthand for an `InvalidParameter` error.
    pub fn invalid(param: impl Into<String>, message: impl Into<String>) -> Self {
        CuboError::InvalidParameter {
            param: param.into(),
            message: message.into(),
        }
    }

    /// Whether the error was caused by the caller's input rather than by a
    /// remote service or the environment.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            CuboError::InvalidParameter { .. }
                | CuboError::UnknownUnit(_)
                | CuboError::InvalidDate(_)
        )
    }
}

impl From<std::io::Error> for CuboError {
    fn from(err: std::io::Error) -> Self {
        CuboError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for CuboError {
    fn from(err: serde_json::Error) -> Self {
        CuboError::Catalog(format!("JSON error: {}", err))
    }
}
