//! Filter panel state: which facet category the visitor is browsing.

use serde::Serialize;

use super::FacetSet;
use crate::models::{FacetCategory, FilterFacet};

/// The panel is either closed or open on one category. Transitions never
/// touch the network; they only change which facets are listed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "category", rename_all = "lowercase")]
pub enum FilterPanel {
    #[default]
    Closed,
    Open(FacetCategory),
}

impl FilterPanel {
    pub fn open(self, category: FacetCategory) -> Self {
        FilterPanel::Open(category)
    }

    pub fn category(&self) -> Option<FacetCategory> {
        match self {
            FilterPanel::Closed => None,
            FilterPanel::Open(category) => Some(*category),
        }
    }

    /// Facets listed by the panel: those of the open category, none when closed.
    pub fn facets<'a>(&self, set: &'a FacetSet) -> Vec<&'a FilterFacet> {
        match self.category() {
            Some(category) => set.in_category(category).collect(),
            None => Vec::new(),
        }
    }
}
