//! Filter endpoints.
//!
//! The server keeps no per-visitor state. Clients send the keys of their
//! active facets with every request and get back the new facet state along
//! with the records it lets through.
//!
//! Facets reset whenever the directory is refreshed. A selection made against
//! an older `revisionId` is answered with the cleared state of the current
//! directory instead of being carried over.

use axum::{extract::State, Json};
use serde::Deserialize;

use super::{error, loaded, success, ApiResult};
use crate::errors::AppError;
use crate::filter::{self, FilterOutcome};
use crate::models::{Directory, FacetKey};
use crate::AppState;

/// Request body for applying a facet selection.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionRequest {
    /// Revision the selection was made against.
    #[serde(default)]
    pub revision_id: Option<u64>,
    #[serde(default)]
    pub active: Vec<FacetKey>,
}

/// Request body for toggling one facet.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleRequest {
    #[serde(default)]
    pub revision_id: Option<u64>,
    /// Facets active before the toggle.
    #[serde(default)]
    pub active: Vec<FacetKey>,
    pub toggle: FacetKey,
}

/// Cleared state of `directory` when the request refers to another generation.
fn reset_if_outdated(directory: &Directory, revision_id: Option<u64>) -> Option<FilterOutcome> {
    match revision_id {
        Some(revision) if revision != directory.revision_id => {
            tracing::debug!(
                requested = revision,
                current = directory.revision_id,
                "Facet selection refers to a refreshed directory, clearing"
            );
            Some(filter::clear(&directory.designers, &directory.facets))
        }
        _ => None,
    }
}

/// POST /api/filter - Show the designers matching a set of active facets.
pub async fn apply_filter(
    State(state): State<AppState>,
    Json(request): Json<SelectionRequest>,
) -> ApiResult<FilterOutcome> {
    let snapshot = state.directory.current().await;
    let directory = loaded(&snapshot)?;

    if let Some(reset) = reset_if_outdated(&directory, request.revision_id) {
        return success(reset, snapshot.revision_id);
    }

    match directory.facets.with_active(&request.active) {
        Ok(facets) => success(
            filter::select(&directory.designers, facets),
            snapshot.revision_id,
        ),
        Err(e) => error(AppError::Validation(e.to_string()), snapshot.revision_id),
    }
}

/// POST /api/filter/toggle - Flip one facet.
pub async fn toggle_filter(
    State(state): State<AppState>,
    Json(request): Json<ToggleRequest>,
) -> ApiResult<FilterOutcome> {
    let snapshot = state.directory.current().await;
    let directory = loaded(&snapshot)?;

    if let Some(reset) = reset_if_outdated(&directory, request.revision_id) {
        return success(reset, snapshot.revision_id);
    }

    let outcome = directory
        .facets
        .with_active(&request.active)
        .and_then(|facets| filter::apply_toggle(&directory.designers, &facets, &request.toggle));

    match outcome {
        Ok(outcome) => success(outcome, snapshot.revision_id),
        Err(e) => error(AppError::Validation(e.to_string()), snapshot.revision_id),
    }
}

/// POST /api/filter/clear - Drop every active facet.
pub async fn clear_filter(State(state): State<AppState>) -> ApiResult<FilterOutcome> {
    let snapshot = state.directory.current().await;
    let directory = loaded(&snapshot)?;

    success(
        filter::clear(&directory.designers, &directory.facets),
        snapshot.revision_id,
    )
}
