//! Turns raw sheet rows into [`TalentRecord`]s.
//!
//! Sheets drift: columns get added, reordered or renamed over time. A
//! [`ColumnLayout`] says which position holds which field, so a new sheet
//! revision only needs a configuration change. Header rows are skipped by
//! count, never by matching their text.

use std::str::FromStr;

use crate::models::TalentRecord;

/// A field a sheet column can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Name,
    Location,
    Expertise,
    Link,
    Approved,
    Order,
    Photo,
    Linkedin,
    Instagram,
    Ignore,
}

impl FromStr for Column {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "name" => Ok(Column::Name),
            "location" => Ok(Column::Location),
            "expertise" => Ok(Column::Expertise),
            "link" | "url" => Ok(Column::Link),
            "approved" | "approval" | "show" => Ok(Column::Approved),
            "order" | "sort_order" | "featured" => Ok(Column::Order),
            "photo" => Ok(Column::Photo),
            "linkedin" => Ok(Column::Linkedin),
            "instagram" => Ok(Column::Instagram),
            "ignore" | "-" | "" => Ok(Column::Ignore),
            other => Err(format!("unknown column {:?}", other)),
        }
    }
}

/// Position of each field within a row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnLayout {
    columns: Vec<Column>,
}

impl ColumnLayout {
    /// Six-column layout of the original sheet.
    pub const CLASSIC: &'static str = "name,location,expertise,link,approved,order";

    pub fn new(columns: Vec<Column>) -> Result<Self, String> {
        for required in [Column::Name, Column::Approved] {
            if !columns.contains(&required) {
                return Err(format!("layout has no {:?} column", required));
            }
        }
        for (idx, column) in columns.iter().enumerate() {
            if *column != Column::Ignore && columns[..idx].contains(column) {
                return Err(format!("{:?} column appears twice", column));
            }
        }
        Ok(Self { columns })
    }

    fn position(&self, column: Column) -> Option<usize> {
        self.columns.iter().position(|c| *c == column)
    }

    /// Trimmed cell for `column`, empty when the layout or the row lacks it.
    fn cell<'a>(&self, row: &'a [String], column: Column) -> &'a str {
        self.position(column)
            .and_then(|idx| row.get(idx))
            .map(|cell| cell.trim())
            .unwrap_or("")
    }

    fn optional_cell(&self, row: &[String], column: Column) -> Option<String> {
        Some(self.cell(row, column))
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    }
}

impl Default for ColumnLayout {
    fn default() -> Self {
        Self {
            columns: vec![
                Column::Name,
                Column::Location,
                Column::Expertise,
                Column::Link,
                Column::Approved,
                Column::Order,
            ],
        }
    }
}

impl FromStr for ColumnLayout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let columns = s
            .split(',')
            .map(Column::from_str)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(columns)
    }
}

/// How the approval cell is compared against "Yes".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ApprovalMatch {
    #[default]
    Exact,
    CaseInsensitive,
}

impl ApprovalMatch {
    pub fn is_approved(&self, flag: &str) -> bool {
        match self {
            ApprovalMatch::Exact => flag == "Yes",
            ApprovalMatch::CaseInsensitive => flag.eq_ignore_ascii_case("yes"),
        }
    }
}

impl FromStr for ApprovalMatch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exact" => Ok(ApprovalMatch::Exact),
            "case-insensitive" | "insensitive" => Ok(ApprovalMatch::CaseInsensitive),
            other => Err(format!("expected exact or case-insensitive, got {:?}", other)),
        }
    }
}

/// Integer, else a float truncated toward zero, else 0.
pub fn parse_sort_order(raw: &str) -> i64 {
    let raw = raw.trim();
    raw.parse::<i64>()
        .ok()
        .or_else(|| {
            raw.parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map(|f| f.trunc() as i64)
        })
        .unwrap_or(0)
}

/// Build the record for one row, without applying the inclusion gates.
pub fn candidate(row: &[String], layout: &ColumnLayout) -> TalentRecord {
    let expertise = layout.cell(row, Column::Expertise).to_string();
    TalentRecord {
        name: layout.cell(row, Column::Name).to_string(),
        location: layout.cell(row, Column::Location).to_string(),
        expertise_tags: TalentRecord::split_expertise(&expertise),
        expertise,
        link: layout.cell(row, Column::Link).to_string(),
        approval: layout.cell(row, Column::Approved).to_string(),
        sort_order: parse_sort_order(layout.cell(row, Column::Order)),
        photo: layout.optional_cell(row, Column::Photo),
        linkedin: layout.optional_cell(row, Column::Linkedin),
        instagram: layout.optional_cell(row, Column::Instagram),
    }
}

/// Skip `header_rows`, build records and keep the named, approved ones in sheet order.
pub fn normalize_rows(
    rows: &[Vec<String>],
    layout: &ColumnLayout,
    header_rows: usize,
    approval: ApprovalMatch,
) -> Vec<TalentRecord> {
    rows.iter()
        .enumerate()
        .skip(header_rows)
        .filter_map(|(idx, row)| {
            let record = candidate(row, layout);
            if record.name.is_empty() {
                tracing::debug!(row = idx, "Dropping row without a name");
                None
            } else if !approval.is_approved(&record.approval) {
                tracing::debug!(row = idx, name = %record.name, "Dropping unapproved row");
                None
            } else {
                Some(record)
            }
        })
        .collect()
}
