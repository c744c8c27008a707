// SPDX-FileCopyrightText: 2026 Cirrus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inventory record operations: versioned triple replacement, filtered reads,
//! and expiry purge.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use cirrus_core::{
    CirrusError, InventoryFilter, InventoryPage, InventoryQuery, ReplaceOutcome, ResourceRecord,
    RunStamp, Triple,
};
use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter};

use crate::codec::{fmt_ts, parse_service, parse_ts};
use crate::database::{map_tr_err, Database};

const RECORD_COLUMNS: &str =
    "service, account_id, region, resource_id, attributes, collected_at, expires_at";

/// Replace every record of `triple` with `records` in one transaction.
///
/// New rows are upserted under `stamp.run_id` first; rows of the triple still
/// carrying an older run id are deleted afterwards. Duplicate resource ids in
/// `records` collapse to the last occurrence.
pub async fn replace_triple(
    db: &Database,
    triple: &Triple,
    stamp: &RunStamp,
    records: Vec<ResourceRecord>,
) -> Result<ReplaceOutcome, CirrusError> {
    let mut rows = BTreeMap::new();
    for record in records {
        if record.service != triple.service
            || record.account_id != triple.account_id
            || record.region != triple.region
        {
            return Err(CirrusError::Internal(format!(
                "record {} belongs to {}, not {triple}",
                record.resource_id,
                record.triple()
            )));
        }
        let attributes = serde_json::to_string(&record.attributes).map_err(|e| {
            CirrusError::Storage {
                source: Box::new(e),
            }
        })?;
        rows.insert(record.resource_id, attributes);
    }

    let partition_key = triple.partition_key();
    let service = triple.service.to_string();
    let account_id = triple.account_id.clone();
    let region = triple.region.clone();
    let run_id = stamp.run_id.to_string();
    let collected_at = fmt_ts(&stamp.collected_at);
    let expires_at = fmt_ts(&stamp.expires_at);

    db.connection()
        .call(move |conn| -> Result<ReplaceOutcome, rusqlite::Error> {
            let tx = conn.transaction()?;
            let mut written = 0;
            {
                let mut upsert = tx.prepare_cached(
                    "INSERT INTO inventory_records
                        (partition_key, resource_id, service, account_id, region,
                         attributes, run_id, collected_at, expires_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                     ON CONFLICT (partition_key, resource_id) DO UPDATE SET
                        attributes = excluded.attributes,
                        run_id = excluded.run_id,
                        collected_at = excluded.collected_at,
                        expires_at = excluded.expires_at",
                )?;
                for (resource_id, attributes) in &rows {
                    written += upsert.execute(params![
                        partition_key,
                        resource_id,
                        service,
                        account_id,
                        region,
                        attributes,
                        run_id,
                        collected_at,
                        expires_at,
                    ])?;
                }
            }
            let removed = tx.execute(
                "DELETE FROM inventory_records WHERE partition_key = ?1 AND run_id <> ?2",
                params![partition_key, run_id],
            )?;
            tx.commit()?;
            Ok(ReplaceOutcome { written, removed })
        })
        .await
        .map_err(map_tr_err)
}

/// WHERE clause and bound values for an inventory filter.
struct Clause {
    sql: String,
    values: Vec<Value>,
}

fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

fn build_clause(filter: &InventoryFilter, now: &DateTime<Utc>) -> Clause {
    let mut conditions = vec!["service = ?".to_string(), "expires_at > ?".to_string()];
    let mut values = vec![
        Value::Text(filter.service.to_string()),
        Value::Text(fmt_ts(now)),
    ];

    let mut in_list = |column: &str, items: &Option<Vec<String>>| {
        if let Some(items) = items.as_ref().filter(|items| !items.is_empty()) {
            let marks = vec!["?"; items.len()].join(", ");
            conditions.push(format!("{column} IN ({marks})"));
            values.extend(items.iter().cloned().map(Value::Text));
        }
    };
    in_list("account_id", &filter.account_ids);
    in_list("region", &filter.regions);

    if let Some(term) = filter.search_term() {
        let pattern = escape_like(&term);
        conditions.push(
            "(LOWER(resource_id) LIKE ? ESCAPE '\\' OR LOWER(attributes) LIKE ? ESCAPE '\\')"
                .to_string(),
        );
        values.push(Value::Text(pattern.clone()));
        values.push(Value::Text(pattern));
    }

    Clause {
        sql: conditions.join(" AND "),
        values,
    }
}

fn map_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<ResourceRecord> {
    let service: String = row.get(0)?;
    let attributes: String = row.get(4)?;
    let collected_at: String = row.get(5)?;
    let expires_at: String = row.get(6)?;
    Ok(ResourceRecord {
        service: parse_service(0, &service)?,
        account_id: row.get(1)?,
        region: row.get(2)?,
        resource_id: row.get(3)?,
        attributes: serde_json::from_str(&attributes)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?,
        collected_at: parse_ts(5, &collected_at)?,
        expires_at: parse_ts(6, &expires_at)?,
    })
}

/// One page of unexpired records plus the total match count, read from one snapshot.
pub async fn query(db: &Database, query: &InventoryQuery) -> Result<InventoryPage, CirrusError> {
    let clause = build_clause(&query.filter, &Utc::now());
    let limit = i64::from(query.page_size());
    let offset = i64::try_from(query.offset()).unwrap_or(i64::MAX);

    let (items, total) = db
        .connection()
        .call(move |conn| -> Result<(Vec<ResourceRecord>, u64), rusqlite::Error> {
            let tx = conn.transaction()?;
            let total: i64 = tx.query_row(
                &format!("SELECT COUNT(*) FROM inventory_records WHERE {}", clause.sql),
                params_from_iter(clause.values.iter()),
                |row| row.get(0),
            )?;

            let mut values = clause.values;
            values.push(Value::Integer(limit));
            values.push(Value::Integer(offset));
            let items = {
                let mut stmt = tx.prepare(&format!(
                    "SELECT {RECORD_COLUMNS} FROM inventory_records WHERE {}
                     ORDER BY account_id, region, resource_id
                     LIMIT ? OFFSET ?",
                    clause.sql
                ))?;
                stmt.query_map(params_from_iter(values.iter()), map_record)?
                    .collect::<Result<Vec<_>, _>>()?
            };
            tx.commit()?;
            Ok((items, u64::try_from(total).unwrap_or(0)))
        })
        .await
        .map_err(map_tr_err)?;

    Ok(InventoryPage::new(items, total, query))
}

/// Every unexpired record matching the filter, ordered as pages are.
pub async fn scan(db: &Database, filter: &InventoryFilter) -> Result<Vec<ResourceRecord>, CirrusError> {
    let clause = build_clause(filter, &Utc::now());
    db.connection()
        .call(move |conn| -> Result<Vec<ResourceRecord>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {RECORD_COLUMNS} FROM inventory_records WHERE {}
                 ORDER BY account_id, region, resource_id",
                clause.sql
            ))?;
            let rows = stmt
                .query_map(params_from_iter(clause.values.iter()), map_record)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
        .map_err(map_tr_err)
}

/// Delete records whose expiry is at or before `now`.
pub async fn purge_expired(db: &Database, now: DateTime<Utc>) -> Result<usize, CirrusError> {
    let cutoff = fmt_ts(&now);
    db.connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            conn.execute(
                "DELETE FROM inventory_records WHERE expires_at <= ?1",
                params![cutoff],
            )
        })
        .await
        .map_err(map_tr_err)
}
