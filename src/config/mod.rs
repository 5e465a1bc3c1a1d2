//! Configuration module for the directory backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.
//! Identifiers and credentials for the spreadsheet are only checked when a
//! fetch is about to happen, see [`SourceConfig::descriptor`].

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::errors::FetchError;
use crate::fetch::{ApprovalMatch, ColumnLayout, ServiceCredentials, SourceDescriptor, SourceKind};
use crate::filter::DisplayOrder;

pub const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const DEFAULT_SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const SPREADSHEET_BASE: &str = "https://docs.google.com/spreadsheets/d";

/// A configuration value that could not be interpreted.
#[derive(Debug, thiserror::Error)]
#[error("invalid value {value:?} for {key}: {reason}")]
pub struct ConfigError {
    pub key: &'static str,
    pub value: String,
    pub reason: String,
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Snapshot age after which a background refresh is started
    pub revalidate: Duration,
    /// Base ordering applied to every fetched generation
    pub display_order: DisplayOrder,
    /// Where the directory rows come from
    pub source: SourceConfig,
}

/// Spreadsheet source settings.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub kind: SourceKind,
    pub sheet_id: Option<String>,
    /// Tab name, used by the visualization endpoint and the Sheets API.
    pub tab: String,
    /// Numeric tab index, used by the CSV export.
    pub gid: u32,
    /// Prebuilt URL that replaces the derived CSV / visualization URL.
    pub url: Option<String>,
    /// Leading rows dropped by count before normalization.
    pub header_rows: usize,
    pub columns: ColumnLayout,
    pub approval: ApprovalMatch,
    pub client_email: Option<String>,
    /// Private key with literal `\n` sequences already unescaped.
    pub private_key: Option<String>,
    pub token_url: String,
    pub api_base: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let bind_addr = parse_or("DIRECTORY_BIND_ADDR", var("DIRECTORY_BIND_ADDR"), "127.0.0.1:8080")?;
        let log_level = var("DIRECTORY_LOG_LEVEL").unwrap_or_else(|| "info".to_string());
        let revalidate_secs: u64 =
            parse_or("DIRECTORY_REVALIDATE_SECS", var("DIRECTORY_REVALIDATE_SECS"), "60")?;
        let display_order = parse_or("DIRECTORY_ORDER", var("DIRECTORY_ORDER"), "alphabetical")?;

        let kind: SourceKind = parse_or("DIRECTORY_SOURCE", var("DIRECTORY_SOURCE"), "csv")?;
        let header_rows = parse_or(
            "DIRECTORY_HEADER_ROWS",
            var("DIRECTORY_HEADER_ROWS"),
            &kind.default_header_rows().to_string(),
        )?;

        let source = SourceConfig {
            kind,
            sheet_id: var("DIRECTORY_SHEET_ID"),
            tab: var("DIRECTORY_SHEET_TAB").unwrap_or_else(|| "Sheet1".to_string()),
            gid: parse_or("DIRECTORY_SHEET_GID", var("DIRECTORY_SHEET_GID"), "0")?,
            url: var("DIRECTORY_SOURCE_URL"),
            header_rows,
            columns: parse_or("DIRECTORY_COLUMNS", var("DIRECTORY_COLUMNS"), ColumnLayout::CLASSIC)?,
            approval: parse_or("DIRECTORY_APPROVAL", var("DIRECTORY_APPROVAL"), "exact")?,
            client_email: var("GOOGLE_CLIENT_EMAIL"),
            private_key: var("GOOGLE_PRIVATE_KEY").map(|key| unescape_private_key(&key)),
            token_url: var("GOOGLE_TOKEN_URL").unwrap_or_else(|| DEFAULT_TOKEN_URL.to_string()),
            api_base: var("GOOGLE_SHEETS_API_BASE")
                .unwrap_or_else(|| DEFAULT_SHEETS_API_BASE.to_string()),
        };

        Ok(Self {
            bind_addr,
            log_level,
            revalidate: Duration::from_secs(revalidate_secs),
            display_order,
            source,
        })
    }
}

impl SourceConfig {
    /// Resolve the configured source into something the fetcher can call.
    ///
    /// Missing identifiers or credentials fail here, before any network traffic.
    pub fn descriptor(&self) -> Result<SourceDescriptor, FetchError> {
        match self.kind {
            SourceKind::Csv => {
                let url = match &self.url {
                    Some(url) => url.clone(),
                    None => format!(
                        "{}/{}/export?format=csv&gid={}",
                        SPREADSHEET_BASE,
                        self.require_sheet_id()?,
                        self.gid
                    ),
                };
                Ok(SourceDescriptor::Csv { url })
            }
            SourceKind::Visualization => {
                let url = match &self.url {
                    Some(url) => url.clone(),
                    None => {
                        let base = format!("{}/{}/gviz/tq", SPREADSHEET_BASE, self.require_sheet_id()?);
                        let mut url = reqwest::Url::parse(&base).map_err(|e| {
                            FetchError::Configuration(format!("invalid sheet URL {}: {}", base, e))
                        })?;
                        url.query_pairs_mut()
                            .append_pair("tqx", "out:json")
                            .append_pair("sheet", &self.tab);
                        url.to_string()
                    }
                };
                Ok(SourceDescriptor::Visualization { url })
            }
            SourceKind::SheetsApi => {
                let sheet_id = self.require_sheet_id()?.to_string();
                let client_email = self.client_email.clone().ok_or_else(|| {
                    FetchError::Configuration("GOOGLE_CLIENT_EMAIL is not set".to_string())
                })?;
                let private_key = self.private_key.clone().ok_or_else(|| {
                    FetchError::Configuration("GOOGLE_PRIVATE_KEY is not set".to_string())
                })?;
                Ok(SourceDescriptor::SheetsApi {
                    sheet_id,
                    range: self.tab.clone(),
                    credentials: ServiceCredentials {
                        client_email,
                        private_key,
                    },
                    token_url: self.token_url.clone(),
                    api_base: self.api_base.clone(),
                })
            }
        }
    }

    fn require_sheet_id(&self) -> Result<&str, FetchError> {
        self.sheet_id
            .as_deref()
            .ok_or_else(|| FetchError::Configuration("DIRECTORY_SHEET_ID is not set".to_string()))
    }
}

/// Keys pasted into environment files usually carry `\n` as two characters.
pub fn unescape_private_key(raw: &str) -> String {
    raw.replace("\\n", "\n")
}

fn parse_or<T>(key: &'static str, value: Option<String>, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let value = value.unwrap_or_else(|| default.to_string());
    match value.parse() {
        Ok(parsed) => Ok(parsed),
        Err(e) => Err(ConfigError {
            key,
            reason: e.to_string(),
            value,
        }),
    }
}
