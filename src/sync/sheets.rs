//! Spreadsheet payload codec.
//!
//! Teams are shared through a single spreadsheet tab holding two cells in
//! column A: the push timestamp in A1 and the compact team JSON in A2. This
//! module only builds and reads those payloads; authentication and the HTTP
//! exchange happen elsewhere.

use crate::models::Team;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SheetsError {
    #[error("no data found in sheet")]
    NoData,

    #[error("failed to parse data from sheet: {0}")]
    Parse(#[source] serde_json::Error),
}

/// Body of a values read or update request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub major_dimension: Option<String>,
    #[serde(default)]
    pub values: Vec<Vec<String>>,
}

/// A1 range of the two payload cells.
pub fn payload_range(tab: &str) -> String {
    format!("{}!A1:A2", tab)
}

/// Build the update body for pushing teams.
pub fn encode_push(tab: &str, teams: &[Team], pushed_at: DateTime<Utc>) -> serde_json::Result<ValueRange> {
    let json = serde_json::to_string(teams)?;
    Ok(ValueRange {
        range: Some(payload_range(tab)),
        major_dimension: Some("COLUMNS".to_string()),
        values: vec![vec![pushed_at.to_rfc3339_opts(SecondsFormat::Millis, true), json]],
    })
}

/// Extract teams from a values read response.
///
/// Reads are row-major, so the team JSON sits in the second row's first cell.
pub fn decode_pull(response: &ValueRange) -> Result<Vec<Team>, SheetsError> {
    let json = response
        .values
        .get(1)
        .and_then(|row| row.first())
        .filter(|cell| !cell.trim().is_empty())
        .ok_or(SheetsError::NoData)?;

    serde_json::from_str(json).map_err(SheetsError::Parse)
}

/// Parse a raw read response body.
pub fn parse_response(text: &str) -> Result<ValueRange, SheetsError> {
    serde_json::from_str(text).map_err(SheetsError::Parse)
}
