//! Directory snapshot endpoints.

use axum::extract::State;

use super::{loaded, success, ApiResult};
use crate::models::{Directory, RevisionInfo};
use crate::AppState;

/// GET /api/directory - Get the full directory: designers plus facets.
pub async fn get_directory(State(state): State<AppState>) -> ApiResult<Directory> {
    let snapshot = state.directory.current().await;
    let directory = loaded(&snapshot)?;

    success(directory.as_ref().clone(), snapshot.revision_id)
}

/// GET /api/directory/revision - Get the current revision info.
///
/// Answers even when the last fetch failed, so clients can tell a new attempt happened.
pub async fn get_revision(State(state): State<AppState>) -> ApiResult<RevisionInfo> {
    let snapshot = state.directory.current().await;

    success(snapshot.revision_info(), snapshot.revision_id)
}
