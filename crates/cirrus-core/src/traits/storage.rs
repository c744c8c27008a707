// SPDX-FileCopyrightText: 2026 Cirrus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage traits for the inventory store and the freshness ledger.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::CirrusError;
use crate::query::{FreshnessFilter, InventoryFilter, InventoryPage, InventoryQuery};
use crate::types::{FreshnessRecord, ResourceRecord, RunStamp, Triple};

/// Lifecycle of a storage backend.
#[async_trait]
pub trait StorageAdapter: Send + Sync + 'static {
    /// Opens the backend and runs migrations.
    async fn initialize(&self) -> Result<(), CirrusError>;

    /// Closes the backend, flushing pending writes and releasing connections.
    async fn close(&self) -> Result<(), CirrusError>;
}

/// Counts from one triple replacement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaceOutcome {
    /// Records written under the new run id.
    pub written: usize,
    /// Stale records of the triple that were deleted.
    pub removed: usize,
}

/// Durable store of the latest resource records per triple.
#[async_trait]
pub trait InventoryStore: Send + Sync + 'static {
    /// Replaces the full record set of `triple` with `records`.
    ///
    /// All new records are written tagged with `stamp.run_id` before any
    /// record of the triple carrying a different run id is deleted. Readers
    /// never observe a deletion ahead of its replacement set.
    async fn replace_triple(
        &self,
        triple: &Triple,
        stamp: &RunStamp,
        records: Vec<ResourceRecord>,
    ) -> Result<ReplaceOutcome, CirrusError>;

    /// One page of unexpired records matching the query.
    async fn query(&self, query: &InventoryQuery) -> Result<InventoryPage, CirrusError>;

    /// Every unexpired record matching the filter, in page order.
    async fn scan(&self, filter: &InventoryFilter) -> Result<Vec<ResourceRecord>, CirrusError>;

    /// Deletes records whose expiry has passed at `now`. Returns how many were removed.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, CirrusError>;
}

/// Per-triple record of collection attempts.
#[async_trait]
pub trait FreshnessLedger: Send + Sync + 'static {
    /// Records a successful collection. `last_success_at` never moves backwards.
    async fn record_success(
        &self,
        triple: &Triple,
        at: DateTime<Utc>,
        resource_count: u64,
    ) -> Result<(), CirrusError>;

    /// Records a failed attempt, leaving the last success and its count untouched.
    async fn record_failure(
        &self,
        triple: &Triple,
        at: DateTime<Utc>,
        error: &str,
    ) -> Result<(), CirrusError>;

    /// Freshness records matching the filter, ordered by service, account, region.
    async fn freshness(&self, filter: &FreshnessFilter)
        -> Result<Vec<FreshnessRecord>, CirrusError>;
}
