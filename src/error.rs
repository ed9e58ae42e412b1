//! Error types for media-dl
//!
//! This module provides error handling for the library, including:
//! - Domain-specific error types (launch, resolution, process, job)
//! - HTTP status code mapping for API integration
//! - Structured error responses with machine-readable error codes

use crate::types::{JobId, JobState};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for media-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Fragment of the Chromium cookie-database lock message emitted by the
/// fetch tool. Matching on it is the deliberately narrow trigger for the
/// single resolve-without-authentication retry.
const AUTH_CONTENTION_MARKER: &str = "Could not copy";

/// Main error type for media-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "download.retention")
        key: Option<String>,
    },

    /// The external fetch tool could not be started at all
    /// (binary missing, permission denied). Distinct from a non-zero exit.
    #[error("failed to launch fetch tool: {0}")]
    Launch(String),

    /// Metadata resolution failed; no fetch process was launched
    #[error("metadata resolution failed: {message}")]
    Resolution {
        /// The tool's own failure message
        message: String,
        /// Optional human-readable remediation hint for the client
        suggestion: Option<String>,
    },

    /// The fetch process ran but exited unsuccessfully
    #[error("fetch process failed: {message}")]
    Process {
        /// The process's own failure message (stderr tail or exit code)
        message: String,
    },

    /// Job-level error (verification, retrieval)
    #[error("{0}")]
    Job(#[from] JobError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether this is a resolution failure attributable to contention on the
    /// authentication store (a browser holding the cookie database locked).
    ///
    /// Best-effort string match on the tool's message; only used to decide
    /// the one-shot resolve retry without authentication.
    pub fn is_auth_contention(&self) -> bool {
        matches!(self, Error::Resolution { message, .. } if message.contains(AUTH_CONTENTION_MARKER))
    }
}

/// Job verification and retrieval errors
#[derive(Debug, Error)]
pub enum JobError {
    /// The fetch process exited cleanly but left nothing in the store
    #[error("job {id} produced no output file")]
    NoOutputProduced {
        /// The job whose output is missing
        id: JobId,
    },

    /// The fetch process left only a zero-byte file
    #[error("job {id} produced an empty output file at {path}")]
    EmptyOutput {
        /// The job whose output is empty
        id: JobId,
        /// The empty file that was found
        path: PathBuf,
    },

    /// Unknown job identifier
    #[error("job {id} not found")]
    NotFound {
        /// The identifier that was not found
        id: JobId,
    },

    /// Known job, but its artifact is not retrievable in the current state
    #[error("job {id} is not ready for retrieval: current state is {state}")]
    NotReady {
        /// The job that was queried
        id: JobId,
        /// The job's current state, included to aid diagnosis
        state: JobState,
    },
}

/// API error response format
///
/// Returned by API endpoints when an error occurs, with a machine-readable
/// code, a human-readable message, and optional contextual details.
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "not_ready",
///     "message": "job 1700000000000-0 is not ready for retrieval: current state is downloading",
///     "details": {
///       "job_id": "1700000000000-0",
///       "state": "downloading"
///     }
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "not_found", "resolution_failure")
    pub code: String,

    /// Human-readable error message, suitable for displaying to end users
    pub message: String,

    /// Optional additional context about the error
    /// (job id, current state, remediation suggestion, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    /// Create an API error with additional details
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - invalid input
            Error::Config { .. } => 400,

            // 404 Not Found
            Error::Job(JobError::NotFound { .. }) => 404,

            // 409 Conflict - resource exists but is not in a retrievable state
            Error::Job(JobError::NotReady { .. }) => 409,

            // 502 Bad Gateway - the external tool failed to deliver
            Error::Resolution { .. } => 502,
            Error::Process { .. } => 502,
            Error::Job(JobError::NoOutputProduced { .. }) => 502,
            Error::Job(JobError::EmptyOutput { .. }) => 502,

            // 503 Service Unavailable - the external tool is not invocable
            Error::Launch(_) => 503,

            // 500 Internal Server Error
            Error::Io(_) => 500,
            Error::Serialization(_) => 500,
            Error::ApiServerError(_) => 500,
            Error::Other(_) => 500,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Launch(_) => "launch_failure",
            Error::Resolution { .. } => "resolution_failure",
            Error::Process { .. } => "process_failure",
            Error::Job(e) => match e {
                JobError::NoOutputProduced { .. } => "no_output_produced",
                JobError::EmptyOutput { .. } => "empty_output",
                JobError::NotFound { .. } => "job_not_found",
                JobError::NotReady { .. } => "not_ready",
            },
            Error::Io(_) => "io_error",
            Error::Serialization(_) => "serialization_error",
            Error::ApiServerError(_) => "api_server_error",
            Error::Other(_) => "internal_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        let details = match &error {
            Error::Config { key: Some(key), .. } => Some(serde_json::json!({
                "key": key,
            })),
            Error::Resolution {
                suggestion: Some(suggestion),
                ..
            } => Some(serde_json::json!({
                "suggestion": suggestion,
            })),
            Error::Job(JobError::NotFound { id }) => Some(serde_json::json!({
                "job_id": id,
            })),
            Error::Job(JobError::NotReady { id, state }) => Some(serde_json::json!({
                "job_id": id,
                "state": state,
            })),
            Error::Job(JobError::NoOutputProduced { id }) => Some(serde_json::json!({
                "job_id": id,
            })),
            Error::Job(JobError::EmptyOutput { id, path }) => Some(serde_json::json!({
                "job_id": id,
                "path": path,
            })),
            _ => None,
        };

        match details {
            Some(details) => ApiError::with_details(code, message, details),
            None => ApiError::new(code, message),
        }
    }
}
