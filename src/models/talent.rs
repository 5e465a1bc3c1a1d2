//! Talent record model: one approved row of the directory sheet.

use serde::{Deserialize, Serialize};

/// A designer listed in the directory.
///
/// Records are only ever built by the fetcher's normalization step and are
/// never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TalentRecord {
    pub name: String,
    pub location: String,
    /// Raw expertise cell, possibly a comma-separated list.
    pub expertise: String,
    /// `expertise` split on commas, trimmed, empty entries removed.
    pub expertise_tags: Vec<String>,
    pub link: String,
    /// Approval cell as it appeared in the sheet.
    pub approval: String,
    /// Display hint; higher values float to the top under the featured ordering.
    #[serde(default)]
    pub sort_order: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linkedin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instagram: Option<String>,
}

impl TalentRecord {
    /// Split a raw expertise cell into its tags.
    pub fn split_expertise(raw: &str) -> Vec<String> {
        raw.split(',')
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .map(str::to_string)
            .collect()
    }
}
