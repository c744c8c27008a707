// SPDX-FileCopyrightText: 2026 Cirrus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Freshness ledger operations.
//!
//! Both writers are single upserts whose `CASE` arms compare timestamps, so
//! late or out-of-order outcomes never roll the ledger backwards.

use chrono::{DateTime, Utc};
use cirrus_core::{CirrusError, FreshnessFilter, FreshnessRecord, Triple};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter};

use crate::codec::{count_from_sql, count_to_sql, fmt_ts, parse_service, parse_ts};
use crate::database::{map_tr_err, Database};

/// Record a successful collection of `triple` at `at`.
pub async fn record_success(
    db: &Database,
    triple: &Triple,
    at: DateTime<Utc>,
    resource_count: u64,
) -> Result<(), CirrusError> {
    let service = triple.service.to_string();
    let key = triple.ledger_key();
    let account_id = triple.account_id.clone();
    let region = triple.region.clone();
    let at = fmt_ts(&at);
    let count = count_to_sql(resource_count);

    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO freshness
                    (service, account_region, account_id, region,
                     last_success_at, last_attempt_at, resource_count, last_error)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5, ?6, NULL)
                 ON CONFLICT (service, account_region) DO UPDATE SET
                    last_success_at = CASE
                        WHEN last_success_at IS NULL OR excluded.last_success_at >= last_success_at
                        THEN excluded.last_success_at ELSE last_success_at END,
                    resource_count = CASE
                        WHEN last_success_at IS NULL OR excluded.last_success_at >= last_success_at
                        THEN excluded.resource_count ELSE resource_count END,
                    last_error = CASE
                        WHEN excluded.last_attempt_at >= last_attempt_at
                        THEN NULL ELSE last_error END,
                    last_attempt_at = MAX(last_attempt_at, excluded.last_attempt_at)",
                params![service, key, account_id, region, at, count],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Record a failed attempt. The last success and its count are left alone.
pub async fn record_failure(
    db: &Database,
    triple: &Triple,
    at: DateTime<Utc>,
    error: &str,
) -> Result<(), CirrusError> {
    let service = triple.service.to_string();
    let key = triple.ledger_key();
    let account_id = triple.account_id.clone();
    let region = triple.region.clone();
    let at = fmt_ts(&at);
    let error = error.to_string();

    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO freshness
                    (service, account_region, account_id, region,
                     last_success_at, last_attempt_at, resource_count, last_error)
                 VALUES (?1, ?2, ?3, ?4, NULL, ?5, 0, ?6)
                 ON CONFLICT (service, account_region) DO UPDATE SET
                    last_error = CASE
                        WHEN excluded.last_attempt_at >= last_attempt_at
                        THEN excluded.last_error ELSE last_error END,
                    last_attempt_at = MAX(last_attempt_at, excluded.last_attempt_at)",
                params![service, key, account_id, region, at, error],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Ledger rows matching the filter, ordered by service, account, region.
pub async fn freshness(
    db: &Database,
    filter: &FreshnessFilter,
) -> Result<Vec<FreshnessRecord>, CirrusError> {
    let mut conditions = Vec::new();
    let mut values = Vec::new();
    if let Some(service) = filter.service {
        conditions.push("service = ?");
        values.push(Value::Text(service.to_string()));
    }
    if let Some(account_id) = &filter.account_id {
        conditions.push("account_id = ?");
        values.push(Value::Text(account_id.clone()));
    }
    if let Some(region) = &filter.region {
        conditions.push("region = ?");
        values.push(Value::Text(region.clone()));
    }
    let where_sql = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    db.connection()
        .call(move |conn| -> Result<Vec<FreshnessRecord>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT service, account_id, region, last_success_at, last_attempt_at,
                        resource_count, last_error
                 FROM freshness {where_sql}
                 ORDER BY service, account_id, region"
            ))?;
            let rows = stmt
                .query_map(params_from_iter(values.iter()), |row| {
                    let service: String = row.get(0)?;
                    let last_success_at: Option<String> = row.get(3)?;
                    let last_attempt_at: String = row.get(4)?;
                    Ok(FreshnessRecord {
                        service: parse_service(0, &service)?,
                        account_id: row.get(1)?,
                        region: row.get(2)?,
                        last_success_at: last_success_at
                            .map(|raw| parse_ts(3, &raw))
                            .transpose()?,
                        last_attempt_at: parse_ts(4, &last_attempt_at)?,
                        resource_count: count_from_sql(row.get(5)?),
                        last_error: row.get(6)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
        .map_err(map_tr_err)
}
