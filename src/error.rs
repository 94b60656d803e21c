//! Error types for taskdeck
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (bad args, validation, missing session)
//! - 4: Operation failed (io, remote, decode)

use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the taskdeck CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const USER_ERROR: i32 = 2;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Main error type for taskdeck operations
#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Not signed in")]
    NotSignedIn,

    #[error("Remote backend is not configured")]
    RemoteNotConfigured,

    // Operation failures (exit code 4)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Remote request failed with status {status}: {message}")]
    Remote { status: u16, message: String },

    #[error("Realtime feed error: {0}")]
    Realtime(String),

    #[error("Could not decode stored '{key}': {message}")]
    Decode { key: String, message: String },

    #[error("Import failed: {0}")]
    Import(String),

    #[error("Lock acquisition failed: {0}")]
    LockFailed(PathBuf),
}

impl Error {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            // User errors
            Error::InvalidConfig(_)
            | Error::InvalidArgument(_)
            | Error::Validation(_)
            | Error::NotFound { .. }
            | Error::NotSignedIn
            | Error::RemoteNotConfigured => exit_codes::USER_ERROR,

            // Operation failures
            Error::Io(_)
            | Error::Json(_)
            | Error::TomlParse(_)
            | Error::Http(_)
            | Error::Remote { .. }
            | Error::Realtime(_)
            | Error::Decode { .. }
            | Error::Import(_)
            | Error::LockFailed(_) => exit_codes::OPERATION_FAILED,
        }
    }

    /// Structured details for JSON error output, when the variant has any.
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Error::NotFound { kind, id } => Some(serde_json::json!({ "kind": kind, "id": id })),
            Error::Remote { status, .. } => Some(serde_json::json!({ "status": status })),
            Error::Decode { key, .. } => Some(serde_json::json!({ "key": key })),
            _ => None,
        }
    }

    pub(crate) fn task_not_found(id: &str) -> Self {
        Error::NotFound {
            kind: "task",
            id: id.to_string(),
        }
    }

    pub(crate) fn project_not_found(id: &str) -> Self {
        Error::NotFound {
            kind: "project",
            id: id.to_string(),
        }
    }
}

/// Result type alias for taskdeck operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_errors_map_to_exit_code_two() {
        assert_eq!(Error::Validation("title".into()).exit_code(), 2);
        assert_eq!(Error::NotSignedIn.exit_code(), 2);
        assert_eq!(Error::task_not_found("t1").exit_code(), 2);
    }

    #[test]
    fn operation_errors_map_to_exit_code_four() {
        let err = Error::Remote {
            status: 500,
            message: "boom".into(),
        };
        assert_eq!(err.exit_code(), 4);
        assert_eq!(err.details(), Some(serde_json::json!({ "status": 500 })));
        assert_eq!(Error::Import("bad".into()).exit_code(), 4);
    }

    #[test]
    fn not_found_message_names_kind() {
        let err = Error::project_not_found("p9");
        assert_eq!(err.to_string(), "project not found: p9");
    }
}
