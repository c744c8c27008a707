// SPDX-FileCopyrightText: 2026 Cirrus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One-shot CLI commands.
//!
//! Read commands open the database only and never contact AWS. Results are
//! printed to stdout as pretty JSON; export writes its raw rendering.

use std::path::PathBuf;

use chrono::Utc;
use cirrus_config::CirrusConfig;
use cirrus_core::{
    CirrusError, FreshnessFilter, FreshnessLedger, InventoryFilter, InventoryQuery,
    InventoryStore, ServiceKind,
};
use cirrus_cron::SweepScheduler;
use cirrus_engine::{ExportFormat, RefreshAcceptance, export, summary};
use serde_json::json;
use tracing::info;

use crate::stack;

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<(), CirrusError> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|e| CirrusError::Internal(format!("failed to render output: {e}")))?;
    println!("{rendered}");
    Ok(())
}

pub async fn run_sweep(config: &CirrusConfig) -> Result<(), CirrusError> {
    let stack = stack::build(config).await?;
    let scheduler = SweepScheduler::new(&config.schedule, stack.trigger.clone(), stack.store())?;
    let outcome = scheduler.run_once().await;
    print_json(&json!({
        "report": outcome.report,
        "purged": outcome.purged,
    }))?;
    match outcome.report.aborted {
        Some(abort) => Err(CirrusError::Internal(format!("sweep aborted: {}", abort.message))),
        None => Ok(()),
    }
}

pub async fn run_refresh(
    config: &CirrusConfig,
    service: Option<ServiceKind>,
    accounts: Option<Vec<String>>,
) -> Result<(), CirrusError> {
    let stack = stack::build(config).await?;
    match stack.api.request_refresh(service, accounts).await? {
        RefreshAcceptance::Accepted(token) => {
            info!(run_id = %token.run_id, triples = token.triples, "refresh accepted, waiting for report");
            let report = stack.api.trigger().wait(&token).await?;
            print_json(&report)
        }
        rejected @ RefreshAcceptance::AlreadyInProgress { .. } => {
            print_json(&rejected)?;
            rejected.into_result().map(|_| ())
        }
    }
}

pub async fn run_inventory(
    config: &CirrusConfig,
    filter: InventoryFilter,
    page: Option<u32>,
    page_size: Option<u32>,
) -> Result<(), CirrusError> {
    let storage = stack::open_storage(config).await?;
    let page = storage
        .query(&InventoryQuery::new(filter, page, page_size))
        .await?;
    print_json(&page)
}

pub async fn run_freshness(
    config: &CirrusConfig,
    service: Option<ServiceKind>,
    account_id: Option<String>,
    region: Option<String>,
) -> Result<(), CirrusError> {
    let storage = stack::open_storage(config).await?;
    let records = storage
        .freshness(&FreshnessFilter {
            service,
            account_id,
            region,
        })
        .await?;
    print_json(&records)
}

pub async fn run_accounts(config: &CirrusConfig) -> Result<(), CirrusError> {
    let (_aws, directory) = stack::directory(config).await;
    let accounts = directory.list_accounts().await?;
    print_json(&accounts)
}

pub async fn run_summary(config: &CirrusConfig, filter: InventoryFilter) -> Result<(), CirrusError> {
    let storage = stack::open_storage(config).await?;
    let records = storage.scan(&filter).await?;
    print_json(&summary::summarize(filter.service, &records))
}

pub async fn run_export(
    config: &CirrusConfig,
    filter: InventoryFilter,
    format: ExportFormat,
    output: Option<PathBuf>,
) -> Result<(), CirrusError> {
    let storage = stack::open_storage(config).await?;
    let records = storage.scan(&filter).await?;
    let rendered = export::render(filter.service, &records, format)?;
    match output {
        Some(path) => {
            tokio::fs::write(&path, rendered)
                .await
                .map_err(|e| CirrusError::Internal(format!("failed to write {}: {e}", path.display())))?;
            info!(path = %path.display(), records = records.len(), %format, "export written");
        }
        None => print!("{rendered}"),
    }
    Ok(())
}

pub async fn run_purge(config: &CirrusConfig) -> Result<(), CirrusError> {
    let storage = stack::open_storage(config).await?;
    let removed = cirrus_cron::purge_expired(storage.as_ref(), Utc::now()).await?;
    print_json(&json!({ "purged": removed }))
}
