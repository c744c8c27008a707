// SPDX-FileCopyrightText: 2026 Cirrus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! CSV and JSON renderings of stored records.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use cirrus_core::{CirrusError, ResourceRecord, ServiceKind};

/// Columns that lead every CSV row, in this order.
const LEADING_COLUMNS: [&str; 3] = ["accountId", "region", "resourceId"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    #[default]
    Json,
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Csv => "csv",
            Self::Json => "json",
        })
    }
}

impl FromStr for ExportFormat {
    type Err = CirrusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            other => Err(CirrusError::Config(format!(
                "unknown export format `{other}`, expected csv or json"
            ))),
        }
    }
}

pub fn render(
    service: ServiceKind,
    records: &[ResourceRecord],
    format: ExportFormat,
) -> Result<String, CirrusError> {
    match format {
        ExportFormat::Csv => to_csv(records),
        ExportFormat::Json => to_json(service, records),
    }
}

fn to_json(service: ServiceKind, records: &[ResourceRecord]) -> Result<String, CirrusError> {
    let body = json!({
        "service": service,
        "total": records.len(),
        "items": records,
    });
    serde_json::to_string_pretty(&body)
        .map_err(|e| CirrusError::Internal(format!("json export failed: {e}")))
}

/// Nested maps become `parent_child` columns; arrays join with commas.
fn flatten(prefix: &str, value: &Value, out: &mut BTreeMap<String, String>) {
    match value {
        Value::Object(map) => {
            for (key, nested) in map {
                let column = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}_{key}")
                };
                flatten(&column, nested, out);
            }
        }
        other => {
            out.insert(prefix.to_string(), cell(other));
        }
    }
}

fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(cell).collect::<Vec<_>>().join(","),
        Value::Object(_) => value.to_string(),
        other => other.to_string(),
    }
}

fn to_csv(records: &[ResourceRecord]) -> Result<String, CirrusError> {
    let rows: Vec<BTreeMap<String, String>> = records
        .iter()
        .map(|record| {
            let mut row = BTreeMap::new();
            for (key, value) in &record.attributes {
                flatten(key, value, &mut row);
            }
            row.insert("accountId".into(), record.account_id.clone());
            row.insert("region".into(), record.region.clone());
            row.insert("resourceId".into(), record.resource_id.clone());
            row
        })
        .collect();

    let rest: BTreeSet<&str> = rows
        .iter()
        .flat_map(|row| row.keys().map(String::as_str))
        .filter(|key| !LEADING_COLUMNS.contains(key))
        .collect();
    let columns: Vec<&str> = LEADING_COLUMNS.iter().copied().chain(rest).collect();

    let csv_error = |e: csv::Error| CirrusError::Internal(format!("csv export failed: {e}"));
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&columns).map_err(csv_error)?;
    for row in &rows {
        writer
            .write_record(columns.iter().map(|c| row.get(*c).map_or("", String::as_str)))
            .map_err(csv_error)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| CirrusError::Internal(format!("csv export failed: {e}")))?;
    String::from_utf8(bytes).map_err(|e| CirrusError::Internal(format!("csv export failed: {e}")))
}
