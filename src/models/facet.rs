//! Filter facet models.

use serde::{Deserialize, Serialize};

/// The two facet dimensions the directory can be filtered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacetCategory {
    Expertise,
    Location,
}

impl FacetCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            FacetCategory::Expertise => "expertise",
            FacetCategory::Location => "location",
        }
    }
}

/// Identifies one facet: labels are unique within a category.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FacetKey {
    pub category: FacetCategory,
    pub label: String,
}

impl FacetKey {
    pub fn new(category: FacetCategory, label: impl Into<String>) -> Self {
        Self {
            category,
            label: label.into(),
        }
    }
}

impl std::fmt::Display for FacetKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} facet {:?}", self.category.as_str(), self.label)
    }
}

/// A selectable filter option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterFacet {
    pub label: String,
    pub category: FacetCategory,
    #[serde(default)]
    pub active: bool,
}

impl FilterFacet {
    pub fn inactive(category: FacetCategory, label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            category,
            active: false,
        }
    }

    pub fn matches(&self, key: &FacetKey) -> bool {
        self.category == key.category && self.label == key.label
    }
}
