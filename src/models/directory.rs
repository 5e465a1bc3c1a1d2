//! Directory snapshot model returned to the page.

use serde::{Deserialize, Serialize};

use super::TalentRecord;
use crate::filter::FacetSet;

/// One fetched generation of the directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Directory {
    pub revision_id: u64,
    pub generated_at: String,
    /// Approved records in display order.
    pub designers: Vec<TalentRecord>,
    /// Facet universe, all inactive.
    pub facets: FacetSet,
}

/// Revision information for change detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionInfo {
    pub revision_id: u64,
    pub generated_at: String,
}
