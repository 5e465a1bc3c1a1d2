//! Facet listing endpoint.

use axum::extract::{Query, State};
use serde::Deserialize;

use super::{loaded, success, ApiResult};
use crate::filter::FilterPanel;
use crate::models::{FacetCategory, FilterFacet};
use crate::AppState;

/// Facet query parameters.
#[derive(Debug, Deserialize)]
pub struct FacetQuery {
    /// Restrict to the facets a panel opened on this category would list.
    #[serde(default)]
    pub category: Option<FacetCategory>,
}

/// GET /api/facets - List the facet universe, all inactive.
pub async fn list_facets(
    State(state): State<AppState>,
    Query(params): Query<FacetQuery>,
) -> ApiResult<Vec<FilterFacet>> {
    let snapshot = state.directory.current().await;
    let directory = loaded(&snapshot)?;

    let facets = match params.category {
        Some(category) => FilterPanel::default()
            .open(category)
            .facets(&directory.facets)
            .into_iter()
            .cloned()
            .collect(),
        None => directory.facets.facets().to_vec(),
    };

    success(facets, snapshot.revision_id)
}
