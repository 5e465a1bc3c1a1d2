//! Parser for the public visualization query endpoint (`/gviz/tq?tqx=out:json`).
//!
//! The endpoint answers with JavaScript, not JSON:
//! `/*O_o*/\ngoogle.visualization.Query.setResponse({...});`
//! The object literal inside the call is valid JSON once the wrapper is removed.

use serde::Deserialize;
use serde_json::Value;

use super::cell_text;
use crate::errors::FetchError;

const WRAPPER_START: &str = "setResponse(";

#[derive(Debug, Deserialize)]
struct Payload {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    errors: Vec<Issue>,
    #[serde(default)]
    table: Option<Table>,
}

#[derive(Debug, Deserialize)]
struct Issue {
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    detailed_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Table {
    #[serde(default)]
    rows: Vec<Row>,
}

#[derive(Debug, Deserialize)]
struct Row {
    #[serde(default)]
    c: Vec<Option<Cell>>,
}

#[derive(Debug, Deserialize)]
struct Cell {
    #[serde(default)]
    v: Value,
}

/// Return the JSON object embedded in the response wrapper.
pub fn strip_wrapper(body: &str) -> Result<&str, FetchError> {
    let start = body
        .find(WRAPPER_START)
        .map(|idx| idx + WRAPPER_START.len())
        .ok_or_else(|| FetchError::Parse("visualization response has no setResponse wrapper".into()))?;
    let end = body
        .rfind(')')
        .filter(|end| *end > start)
        .ok_or_else(|| FetchError::Parse("visualization response wrapper is not closed".into()))?;
    Ok(&body[start..end])
}

/// Parse a wrapped visualization response into rows of string cells.
pub fn parse_payload(body: &str) -> Result<Vec<Vec<String>>, FetchError> {
    let payload: Payload = serde_json::from_str(strip_wrapper(body)?)?;

    if payload.status.as_deref() == Some("error") {
        let detail = payload
            .errors
            .iter()
            .map(|issue| {
                issue
                    .detailed_message
                    .as_deref()
                    .or(issue.reason.as_deref())
                    .unwrap_or("unknown")
            })
            .collect::<Vec<_>>()
            .join("; ");
        return Err(FetchError::Parse(format!("visualization query failed: {}", detail)));
    }

    let table = payload
        .table
        .ok_or_else(|| FetchError::Parse("visualization response has no table".into()))?;

    Ok(table
        .rows
        .into_iter()
        .map(|row| {
            row.c
                .iter()
                .map(|cell| cell.as_ref().map(|c| cell_text(&c.v)).unwrap_or_default())
                .collect()
        })
        .collect())
}
