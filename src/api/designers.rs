//! Designer list endpoint.

use axum::extract::State;

use super::{loaded, success, ApiResult};
use crate::models::TalentRecord;
use crate::AppState;

/// GET /api/designers - List every approved designer in display order.
pub async fn list_designers(State(state): State<AppState>) -> ApiResult<Vec<TalentRecord>> {
    let snapshot = state.directory.current().await;
    let directory = loaded(&snapshot)?;

    success(directory.designers.clone(), snapshot.revision_id)
}
