//! Authenticated access through the Sheets `values` API.
//!
//! A service account signs a short-lived RS256 assertion, trades it for an
//! access token and reads the tab as a two-dimensional array of strings.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::cell_text;
use crate::errors::FetchError;

pub const READONLY_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets.readonly";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_MINUTES: i64 = 60;

/// Service account identity used to read a private sheet.
#[derive(Clone, PartialEq, Eq)]
pub struct ServiceCredentials {
    pub client_email: String,
    pub private_key: String,
}

impl std::fmt::Debug for ServiceCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceCredentials")
            .field("client_email", &self.client_email)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

/// Sign the assertion presented to the token endpoint.
pub fn build_assertion(
    credentials: &ServiceCredentials,
    token_url: &str,
    now: DateTime<Utc>,
) -> Result<String, FetchError> {
    let key = EncodingKey::from_rsa_pem(credentials.private_key.as_bytes())
        .map_err(|e| FetchError::Configuration(format!("unusable GOOGLE_PRIVATE_KEY: {}", e)))?;
    let claims = Claims {
        iss: &credentials.client_email,
        scope: READONLY_SCOPE,
        aud: token_url,
        iat: now.timestamp(),
        exp: (now + Duration::minutes(ASSERTION_LIFETIME_MINUTES)).timestamp(),
    };
    encode(&Header::new(Algorithm::RS256), &claims, &key)
        .map_err(|e| FetchError::Configuration(format!("failed to sign service assertion: {}", e)))
}

async fn request_access_token(
    client: &Client,
    credentials: &ServiceCredentials,
    token_url: &str,
) -> Result<String, FetchError> {
    let assertion = build_assertion(credentials, token_url, Utc::now())?;
    let response = client
        .post(token_url)
        .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
        .send()
        .await?
        .error_for_status()?;
    let token: TokenResponse = response.json().await?;
    Ok(token.access_token)
}

/// Build `{api_base}/{sheet_id}/values/{range}` with each segment escaped.
pub fn values_url(api_base: &str, sheet_id: &str, range: &str) -> Result<Url, FetchError> {
    let mut url = Url::parse(api_base)
        .map_err(|e| FetchError::Configuration(format!("invalid Sheets API base {}: {}", api_base, e)))?;
    url.path_segments_mut()
        .map_err(|_| FetchError::Configuration(format!("Sheets API base {} cannot take a path", api_base)))?
        .pop_if_empty()
        .extend([sheet_id, "values", range]);
    Ok(url)
}

/// Parse a `ValueRange` body. A tab with no data omits `values` entirely.
pub fn parse_values(body: &str) -> Result<Vec<Vec<String>>, FetchError> {
    let range: ValueRange = serde_json::from_str(body)?;
    Ok(range
        .values
        .iter()
        .map(|row| row.iter().map(cell_text).collect())
        .collect())
}

/// Fetch every row of `range` from the sheet.
pub async fn fetch_rows(
    client: &Client,
    sheet_id: &str,
    range: &str,
    credentials: &ServiceCredentials,
    token_url: &str,
    api_base: &str,
) -> Result<Vec<Vec<String>>, FetchError> {
    let token = request_access_token(client, credentials, token_url).await?;
    let url = values_url(api_base, sheet_id, range)?;
    let body = client
        .get(url)
        .bearer_auth(token)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;
    parse_values(&body)
}
