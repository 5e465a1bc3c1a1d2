//! Base display ordering of a fetched directory.

use std::cmp::Ordering;
use std::str::FromStr;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::models::TalentRecord;

/// How an unfiltered directory is ordered.
///
/// Applied once per fetch. Filtered views keep this order, so clearing a
/// filter gives back exactly the list that was shown before it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DisplayOrder {
    /// By name, ignoring case.
    #[default]
    Alphabetical,
    /// Random order, then records with a higher `sort_order` moved to the front.
    ShuffleFeatured,
}

impl DisplayOrder {
    pub fn arrange(self, records: Vec<TalentRecord>) -> Vec<TalentRecord> {
        self.arrange_with(records, &mut rand::thread_rng())
    }

    pub fn arrange_with<R: Rng + ?Sized>(
        self,
        mut records: Vec<TalentRecord>,
        rng: &mut R,
    ) -> Vec<TalentRecord> {
        match self {
            DisplayOrder::Alphabetical => {
                records.sort_by(|a, b| compare_names(&a.name, &b.name));
            }
            DisplayOrder::ShuffleFeatured => {
                records.shuffle(rng);
                // stable: equal sort_order keeps the shuffled order
                records.sort_by(|a, b| b.sort_order.cmp(&a.sort_order));
            }
        }
        records
    }
}

impl FromStr for DisplayOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "alphabetical" | "name" => Ok(DisplayOrder::Alphabetical),
            "shuffle-featured" | "shuffle" => Ok(DisplayOrder::ShuffleFeatured),
            other => Err(format!("expected alphabetical or shuffle-featured, got {:?}", other)),
        }
    }
}

fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}
