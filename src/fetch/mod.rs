//! Directory fetcher.
//!
//! Reads the directory sheet through one of three wire formats and
//! normalizes the rows into approved [`TalentRecord`]s, in sheet order.

mod csv;
mod gviz;
mod normalize;
mod sheets_api;

pub use normalize::{normalize_rows, ApprovalMatch, ColumnLayout};
pub use sheets_api::ServiceCredentials;

use std::str::FromStr;

use reqwest::Client;
use serde_json::Value;

use crate::config::SourceConfig;
use crate::errors::FetchError;
use crate::models::TalentRecord;

/// Which upstream format to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Public CSV export.
    Csv,
    /// Public visualization query returning wrapped JSON.
    Visualization,
    /// Authenticated Sheets `values` API.
    SheetsApi,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Csv => "csv",
            SourceKind::Visualization => "gviz",
            SourceKind::SheetsApi => "sheets-api",
        }
    }

    /// The visualization endpoint turns the header row into column labels,
    /// the other two return it as the first row.
    pub fn default_header_rows(&self) -> usize {
        match self {
            SourceKind::Visualization => 0,
            SourceKind::Csv | SourceKind::SheetsApi => 1,
        }
    }
}

impl FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(SourceKind::Csv),
            "gviz" | "visualization" => Ok(SourceKind::Visualization),
            "sheets-api" | "api" => Ok(SourceKind::SheetsApi),
            other => Err(format!("expected csv, gviz or sheets-api, got {:?}", other)),
        }
    }
}

/// A fully resolved source, ready to be fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceDescriptor {
    Csv {
        url: String,
    },
    Visualization {
        url: String,
    },
    SheetsApi {
        sheet_id: String,
        range: String,
        credentials: ServiceCredentials,
        token_url: String,
        api_base: String,
    },
}

impl SourceDescriptor {
    pub fn kind(&self) -> SourceKind {
        match self {
            SourceDescriptor::Csv { .. } => SourceKind::Csv,
            SourceDescriptor::Visualization { .. } => SourceKind::Visualization,
            SourceDescriptor::SheetsApi { .. } => SourceKind::SheetsApi,
        }
    }
}

/// Render a JSON cell as the string a spreadsheet would show.
///
/// Null becomes empty. Whole numbers drop their fraction so `1.0` reads `1`.
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => i.to_string(),
            (None, Some(f)) if f.fract() == 0.0 && f.abs() < 1e15 => (f as i64).to_string(),
            _ => n.to_string(),
        },
        other => other.to_string(),
    }
}

/// Fetches and normalizes directory records from the configured sheet.
#[derive(Clone)]
pub struct DirectoryFetcher {
    client: Client,
    source: SourceConfig,
}

impl DirectoryFetcher {
    pub fn new(client: Client, source: SourceConfig) -> Self {
        Self { client, source }
    }

    /// Fetch the sheet and return its approved records in sheet order.
    ///
    /// Either every record is returned or an error is; there are no partial results.
    pub async fn fetch(&self) -> Result<Vec<TalentRecord>, FetchError> {
        let descriptor = self.source.descriptor()?;

        let rows = match &descriptor {
            SourceDescriptor::Csv { url } => csv::parse_rows(&self.get_text(url).await?),
            SourceDescriptor::Visualization { url } => {
                gviz::parse_payload(&self.get_text(url).await?)?
            }
            SourceDescriptor::SheetsApi {
                sheet_id,
                range,
                credentials,
                token_url,
                api_base,
            } => {
                sheets_api::fetch_rows(
                    &self.client,
                    sheet_id,
                    range,
                    credentials,
                    token_url,
                    api_base,
                )
                .await?
            }
        };

        let records = normalize_rows(
            &rows,
            &self.source.columns,
            self.source.header_rows,
            self.source.approval,
        );

        tracing::info!(
            source = descriptor.kind().as_str(),
            rows = rows.len(),
            records = records.len(),
            "Fetched directory sheet"
        );

        Ok(records)
    }

    async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.text().await?)
    }
}
