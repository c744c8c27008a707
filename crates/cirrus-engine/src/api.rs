// SPDX-FileCopyrightText: 2026 Cirrus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The read facade offered to an HTTP or CLI layer.
//!
//! Reads go to the inventory store and freshness ledger only; nothing here
//! ever calls AWS. A failed collection therefore degrades freshness, never
//! read availability.

use std::sync::Arc;
use std::time::{Duration, Instant};

use cirrus_core::{
    AccountDirectory, AccountInfo, CirrusError, FreshnessFilter, FreshnessLedger,
    FreshnessRecord, InventoryFilter, InventoryPage, InventoryQuery, InventoryStore, ServiceKind,
};
use tokio::sync::Mutex;
use tracing::debug;

use crate::export::{self, ExportFormat};
use crate::summary::{self, InventorySummary};
use crate::trigger::{RefreshAcceptance, RefreshTrigger};

struct CachedAccounts {
    fetched: Instant,
    accounts: Vec<AccountInfo>,
}

pub struct InventoryApi {
    store: Arc<dyn InventoryStore>,
    ledger: Arc<dyn FreshnessLedger>,
    directory: Arc<dyn AccountDirectory>,
    trigger: Arc<RefreshTrigger>,
    account_ttl: Duration,
    accounts: Mutex<Option<CachedAccounts>>,
}

impl InventoryApi {
    pub fn new(
        store: Arc<dyn InventoryStore>,
        ledger: Arc<dyn FreshnessLedger>,
        directory: Arc<dyn AccountDirectory>,
        trigger: Arc<RefreshTrigger>,
        account_ttl: Duration,
    ) -> Self {
        Self {
            store,
            ledger,
            directory,
            trigger,
            account_ttl,
            accounts: Mutex::new(None),
        }
    }

    pub fn trigger(&self) -> &Arc<RefreshTrigger> {
        &self.trigger
    }

    pub async fn get_inventory(&self, query: &InventoryQuery) -> Result<InventoryPage, CirrusError> {
        self.store.query(query).await
    }

    pub async fn get_freshness(
        &self,
        filter: &FreshnessFilter,
    ) -> Result<Vec<FreshnessRecord>, CirrusError> {
        self.ledger.freshness(filter).await
    }

    pub async fn request_refresh(
        &self,
        service: Option<ServiceKind>,
        account_ids: Option<Vec<String>>,
    ) -> Result<RefreshAcceptance, CirrusError> {
        self.trigger.on_demand(service, account_ids).await
    }

    /// The directory's account list, cached for the configured TTL.
    ///
    /// Concurrent callers during a refresh wait for the one in progress.
    /// Failures are not cached.
    pub async fn list_accounts(&self) -> Result<Vec<AccountInfo>, CirrusError> {
        let mut cached = self.accounts.lock().await;
        if let Some(entry) = cached.as_ref()
            && entry.fetched.elapsed() < self.account_ttl
        {
            debug!(accounts = entry.accounts.len(), "account list served from cache");
            return Ok(entry.accounts.clone());
        }
        let accounts = self.directory.list_accounts().await?;
        *cached = Some(CachedAccounts {
            fetched: Instant::now(),
            accounts: accounts.clone(),
        });
        Ok(accounts)
    }

    pub async fn summary(&self, filter: &InventoryFilter) -> Result<InventorySummary, CirrusError> {
        let records = self.store.scan(filter).await?;
        Ok(summary::summarize(filter.service, &records))
    }

    pub async fn export(
        &self,
        filter: &InventoryFilter,
        format: ExportFormat,
    ) -> Result<String, CirrusError> {
        let records = self.store.scan(filter).await?;
        export::render(filter.service, &records, format)
    }
}
