//! REST API module.
//!
//! Contains all API routes and handlers for the directory page.

mod designers;
mod directory;
mod facets;
mod filter;

pub use designers::*;
pub use directory::*;
pub use facets::*;
pub use filter::*;

use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::directory::Snapshot;
use crate::errors::{AppError, AppErrorWithRevision};
use crate::models::Directory;

/// Success response envelope.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
    pub revision_id: u64,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(data: T, revision_id: u64) -> Self {
        Self {
            success: true,
            data,
            revision_id,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Response type that can be either success or error.
pub type ApiResult<T> = Result<ApiResponse<T>, AppErrorWithRevision>;

/// Create a successful API response.
pub fn success<T: Serialize>(data: T, revision_id: u64) -> ApiResult<T> {
    Ok(ApiResponse::new(data, revision_id))
}

/// Create an error API response.
pub fn error<T: Serialize>(err: AppError, revision_id: u64) -> ApiResult<T> {
    Err(AppErrorWithRevision {
        error: err,
        revision_id,
    })
}

/// The loaded directory of a snapshot, or the fetch failure as an API error.
fn loaded(snapshot: &Snapshot) -> Result<Arc<Directory>, AppErrorWithRevision> {
    snapshot
        .outcome
        .as_ref()
        .map(Arc::clone)
        .map_err(|e| AppErrorWithRevision {
            error: AppError::Fetch(e.clone()),
            revision_id: snapshot.revision_id,
        })
}
