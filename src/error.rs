// error.rs - Centralized error handling using thiserror

use serde::{Deserialize, Serialize};

/// Crate-wide Result type
pub type Result<T> = std::result::Result<T, Error>;

/// Structured failure taxonomy for the calculation engine and its orchestrators.
///
/// The calculators themselves are total on valid inputs (they never return this type);
/// only validation at the orchestrator/callable boundary and repository I/O produce it.
/// All variants are serializable so a callable entry point can hand one back across the
/// wire unchanged.
#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("unauthenticated")]
    Unauthenticated,

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True for the one variant orchestrators recover from locally (§7 policy).
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Conflict(_))
    }
}

// Implement conversions from common error types

impl From<chrono_tz::ParseError> for Error {
    fn from(err: chrono_tz::ParseError) -> Self {
        Error::InvalidArgument(format!("unrecognized IANA timezone: {err:?}"))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Internal(err.to_string())
    }
}

impl From<tauri::Error> for Error {
    fn from(err: tauri::Error) -> Self {
        Error::Internal(err.to_string())
    }
}
