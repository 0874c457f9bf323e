//! Error taxonomy shared across the ocean services.

use thiserror::Error;

/// Result type alias using OceanError.
pub type OceanResult<T> = Result<T, OceanError>;

/// Primary error type for ingestion, archive and query operations.
///
/// Each variant carries a human-readable context string; callers attach the
/// operation they were performing before surfacing the error upward.
#[derive(Debug, Error)]
pub enum OceanError {
    /// Network failure or non-2xx upstream status.
    #[error("transport error: {0}")]
    Transport(String),

    /// A payload that could not be decoded or fails schema expectations.
    #[error("malformed data: {0}")]
    Malformed(String),

    /// A required upstream attribute or resource is missing.
    #[error("not found: {0}")]
    NotFound(String),

    /// Unique-key violation on replay; benign, callers log and continue.
    #[error("conflict: {0}")]
    Conflict(String),

    /// I/O, database or other operating-environment failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl OceanError {
    /// Get the HTTP status code for this error.
    pub fn http_status_code(&self) -> u16 {
        match self {
            OceanError::NotFound(_) => 404,
            OceanError::Conflict(_) => 409,
            OceanError::Malformed(_) => 422,
            _ => 500,
        }
    }
}

impl From<std::io::Error> for OceanError {
    fn from(err: std::io::Error) -> Self {
        OceanError::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for OceanError {
    fn from(err: serde_json::Error) -> Self {
        OceanError::Malformed(format!("JSON error: {}", err))
    }
}
