//! Error handling module for the directory backend.
//!
//! `FetchError` covers everything that can go wrong between us and the
//! spreadsheet. `AppError` maps failures onto HTTP status codes and the
//! response envelope.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Error codes as constants to avoid stringly-typed errors.
pub mod codes {
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
    pub const CONFIGURATION_ERROR: &str = "CONFIGURATION_ERROR";
    pub const UPSTREAM_UNAVAILABLE: &str = "UPSTREAM_UNAVAILABLE";
    pub const UPSTREAM_MALFORMED: &str = "UPSTREAM_MALFORMED";
}

/// Failure to produce a record list from the upstream spreadsheet.
///
/// Cloneable so a failed fetch can be cached and handed to every caller
/// until the next refresh replaces it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// Required identifier or credential is missing or unusable.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// The upstream could not be reached.
    #[error("transport error: {0}")]
    Transport(String),
    /// The upstream answered with a non-success status.
    #[error("upstream returned status {status} for {url}")]
    Status { status: u16, url: String },
    /// The upstream answered but the payload is not what we expect.
    #[error("parse error: {0}")]
    Parse(String),
}

/// Coarse classification of a [`FetchError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchErrorKind {
    Configuration,
    Transport,
    Parse,
}

impl FetchError {
    pub fn kind(&self) -> FetchErrorKind {
        match self {
            FetchError::Configuration(_) => FetchErrorKind::Configuration,
            FetchError::Transport(_) | FetchError::Status { .. } => FetchErrorKind::Transport,
            FetchError::Parse(_) => FetchErrorKind::Parse,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            FetchError::Parse(format!("undecodable response body: {}", err))
        } else if let Some(status) = err.status() {
            FetchError::Status {
                status: status.as_u16(),
                url: err.url().map(|u| u.to_string()).unwrap_or_default(),
            }
        } else {
            FetchError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Parse(format!("JSON error: {}", err))
    }
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    /// Validation error
    Validation(String),
    /// The directory could not be loaded from the spreadsheet
    Fetch(FetchError),
}

impl AppError {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Fetch(err) => match err.kind() {
                FetchErrorKind::Configuration => StatusCode::INTERNAL_SERVER_ERROR,
                FetchErrorKind::Transport | FetchErrorKind::Parse => StatusCode::BAD_GATEWAY,
            },
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => codes::VALIDATION_ERROR,
            AppError::Fetch(err) => match err.kind() {
                FetchErrorKind::Configuration => codes::CONFIGURATION_ERROR,
                FetchErrorKind::Transport => codes::UPSTREAM_UNAVAILABLE,
                FetchErrorKind::Parse => codes::UPSTREAM_MALFORMED,
            },
        }
    }

    /// Get the error message.
    pub fn message(&self) -> String {
        match self {
            AppError::Validation(msg) => msg.clone(),
            AppError::Fetch(err) => err.to_string(),
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error_code(), self.message())
    }
}

impl std::error::Error for AppError {}

impl From<FetchError> for AppError {
    fn from(err: FetchError) -> Self {
        AppError::Fetch(err)
    }
}

/// Error details in the response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: String,
    pub message: String,
}

/// Error response envelope.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorDetails,
    pub revision_id: u64,
}

impl ErrorResponse {
    pub fn new(error: &AppError, revision_id: u64) -> Self {
        Self {
            success: false,
            error: ErrorDetails {
                code: error.error_code().to_string(),
                message: error.message(),
            },
            revision_id,
        }
    }
}

/// Wrapper type for errors that carry revision_id context.
pub struct AppErrorWithRevision {
    pub error: AppError,
    pub revision_id: u64,
}

impl IntoResponse for AppErrorWithRevision {
    fn into_response(self) -> Response {
        let status = self.error.status_code();
        let body = ErrorResponse::new(&self.error, self.revision_id);
        (status, Json(body)).into_response()
    }
}
