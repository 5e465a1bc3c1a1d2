//! Facet filter engine.
//!
//! Facets are derived from a fetched record list and never mutated in place:
//! toggling or clearing returns a new [`FacetSet`]. Everything here is pure and
//! synchronous, so it can run on every click without coordination.
//!
//! Selection rules:
//! * facets toggle independently (multi-select);
//! * a category with no active facet restricts nothing, which is done by
//!   treating every label of that category as active;
//! * a record is visible when any of its expertise tags (or its raw expertise
//!   when it has no tags) is an effective label, and its location is either
//!   empty or an effective label;
//! * with no active facet at all the directory is shown unfiltered.

mod order;
mod panel;

pub use order::DisplayOrder;
pub use panel::FilterPanel;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::models::{FacetCategory, FacetKey, FilterFacet, TalentRecord};

/// A facet reference that does not exist in the current facet universe.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {0}")]
pub struct UnknownFacet(pub FacetKey);

/// The facet universe of one directory generation, with activation state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FacetSet {
    facets: Vec<FilterFacet>,
}

impl FacetSet {
    /// Expertise facets in first-seen order followed by locations sorted ascending.
    pub fn derive(records: &[TalentRecord]) -> Self {
        let mut expertise: Vec<&str> = Vec::new();
        let mut locations: Vec<&str> = Vec::new();

        for record in records {
            if record.expertise_tags.is_empty() {
                if !record.expertise.is_empty() && !expertise.contains(&record.expertise.as_str()) {
                    expertise.push(&record.expertise);
                }
            } else {
                for tag in &record.expertise_tags {
                    if !expertise.contains(&tag.as_str()) {
                        expertise.push(tag);
                    }
                }
            }
            if !record.location.is_empty() && !locations.contains(&record.location.as_str()) {
                locations.push(&record.location);
            }
        }
        locations.sort_unstable();

        let facets = expertise
            .into_iter()
            .map(|label| FilterFacet::inactive(FacetCategory::Expertise, label))
            .chain(
                locations
                    .into_iter()
                    .map(|label| FilterFacet::inactive(FacetCategory::Location, label)),
            )
            .collect();

        Self { facets }
    }

    pub fn facets(&self) -> &[FilterFacet] {
        &self.facets
    }

    pub fn in_category(&self, category: FacetCategory) -> impl Iterator<Item = &FilterFacet> + '_ {
        self.facets.iter().filter(move |f| f.category == category)
    }

    pub fn active_count(&self) -> usize {
        self.facets.iter().filter(|f| f.active).count()
    }

    /// New set with only the facets named by `keys` active.
    pub fn with_active(&self, keys: &[FacetKey]) -> Result<Self, UnknownFacet> {
        if let Some(unknown) = keys
            .iter()
            .find(|key| !self.facets.iter().any(|f| f.matches(key)))
        {
            return Err(UnknownFacet(unknown.clone()));
        }
        Ok(Self {
            facets: self
                .facets
                .iter()
                .map(|f| FilterFacet {
                    active: keys.iter().any(|key| f.matches(key)),
                    ..f.clone()
                })
                .collect(),
        })
    }

    /// New set with `key` flipped and every other facet unchanged.
    pub fn toggle(&self, key: &FacetKey) -> Result<Self, UnknownFacet> {
        if !self.facets.iter().any(|f| f.matches(key)) {
            return Err(UnknownFacet(key.clone()));
        }
        Ok(Self {
            facets: self
                .facets
                .iter()
                .map(|f| FilterFacet {
                    active: if f.matches(key) { !f.active } else { f.active },
                    ..f.clone()
                })
                .collect(),
        })
    }

    /// New set with every facet inactive.
    pub fn cleared(&self) -> Self {
        Self {
            facets: self
                .facets
                .iter()
                .map(|f| FilterFacet {
                    active: false,
                    ..f.clone()
                })
                .collect(),
        }
    }

    /// Labels treated as active: the active ones, plus every label of a
    /// category that has nothing active.
    pub fn effective_labels(&self) -> HashSet<&str> {
        let mut labels: HashSet<&str> = self
            .facets
            .iter()
            .filter(|f| f.active)
            .map(|f| f.label.as_str())
            .collect();

        for category in [FacetCategory::Expertise, FacetCategory::Location] {
            if !self.in_category(category).any(|f| f.active) {
                labels.extend(self.in_category(category).map(|f| f.label.as_str()));
            }
        }
        labels
    }
}

/// Records of `records` passing the selection in `facets`, order preserved.
pub fn visible(records: &[TalentRecord], facets: &FacetSet) -> Vec<TalentRecord> {
    let labels = facets.effective_labels();
    records
        .iter()
        .filter(|record| is_visible(record, &labels))
        .cloned()
        .collect()
}

fn is_visible(record: &TalentRecord, labels: &HashSet<&str>) -> bool {
    let expertise = if record.expertise_tags.is_empty() {
        labels.contains(record.expertise.as_str())
    } else {
        record
            .expertise_tags
            .iter()
            .any(|tag| labels.contains(tag.as_str()))
    };
    let location = record.location.is_empty() || labels.contains(record.location.as_str());
    expertise && location
}

/// Facet state plus the records it lets through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterOutcome {
    pub facets: FacetSet,
    pub designers: Vec<TalentRecord>,
    /// True when no facet is active and the full directory is shown.
    pub cleared: bool,
}

/// Apply a facet state; with nothing active this is the cleared state.
pub fn select(records: &[TalentRecord], facets: FacetSet) -> FilterOutcome {
    if facets.active_count() == 0 {
        return clear(records, &facets);
    }
    FilterOutcome {
        designers: visible(records, &facets),
        facets,
        cleared: false,
    }
}

/// Flip one facet and recompute the visible records.
pub fn apply_toggle(
    records: &[TalentRecord],
    facets: &FacetSet,
    key: &FacetKey,
) -> Result<FilterOutcome, UnknownFacet> {
    Ok(select(records, facets.toggle(key)?))
}

/// Deactivate every facet and show the full directory in its base order.
pub fn clear(records: &[TalentRecord], facets: &FacetSet) -> FilterOutcome {
    FilterOutcome {
        facets: facets.cleared(),
        designers: records.to_vec(),
        cleared: true,
    }
}
