// SPDX-FileCopyrightText: 2026 Cirrus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the storage traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::OnceCell;
use tracing::debug;

use cirrus_config::model::StorageConfig;
use cirrus_core::{
    CirrusError, FreshnessFilter, FreshnessLedger, FreshnessRecord, InventoryFilter,
    InventoryPage, InventoryQuery, InventoryStore, ReplaceOutcome, ResourceRecord, RunStamp,
    StorageAdapter, Triple,
};

use crate::database::Database;
use crate::queries;

/// SQLite-backed inventory store and freshness ledger.
///
/// Both stores share one [`Database`]; the connection is opened on the first
/// call to [`StorageAdapter::initialize`].
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// The database is not opened until [`StorageAdapter::initialize`] is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Construct and initialize in one step.
    pub async fn open(config: StorageConfig) -> Result<Self, CirrusError> {
        let storage = Self::new(config);
        storage.initialize().await?;
        Ok(storage)
    }

    fn db(&self) -> Result<&Database, CirrusError> {
        self.db.get().ok_or_else(|| CirrusError::Storage {
            source: "storage not initialized, call initialize() first".into(),
        })
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn initialize(&self) -> Result<(), CirrusError> {
        let db = Database::open_with(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| CirrusError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), CirrusError> {
        self.db()?.close().await?;
        debug!("storage closed");
        Ok(())
    }

}

#[async_trait]
impl InventoryStore for SqliteStorage {
    async fn replace_triple(
        &self,
        triple: &Triple,
        stamp: &RunStamp,
        records: Vec<ResourceRecord>,
    ) -> Result<ReplaceOutcome, CirrusError> {
        queries::inventory::replace_triple(self.db()?, triple, stamp, records).await
    }

    async fn query(&self, query: &InventoryQuery) -> Result<InventoryPage, CirrusError> {
        queries::inventory::query(self.db()?, query).await
    }

    async fn scan(&self, filter: &InventoryFilter) -> Result<Vec<ResourceRecord>, CirrusError> {
        queries::inventory::scan(self.db()?, filter).await
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, CirrusError> {
        queries::inventory::purge_expired(self.db()?, now).await
    }
}

#[async_trait]
impl FreshnessLedger for SqliteStorage {
    async fn record_success(
        &self,
        triple: &Triple,
        at: DateTime<Utc>,
        resource_count: u64,
    ) -> Result<(), CirrusError> {
        queries::freshness::record_success(self.db()?, triple, at, resource_count).await
    }

    async fn record_failure(
        &self,
        triple: &Triple,
        at: DateTime<Utc>,
        error: &str,
    ) -> Result<(), CirrusError> {
        queries::freshness::record_failure(self.db()?, triple, at, error).await
    }

    async fn freshness(
        &self,
        filter: &FreshnessFilter,
    ) -> Result<Vec<FreshnessRecord>, CirrusError> {
        queries::freshness::freshness(self.db()?, filter).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use cirrus_core::{now_millis, Attributes, DiscoveredResource, RunId, ServiceKind};
    use tempfile::tempdir;

    fn make_config(path: &str) -> StorageConfig {
        StorageConfig {
            database_path: path.to_string(),
            wal_mode: true,
        }
    }

    #[tokio::test]
    async fn initialize_creates_nested_database_path() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("state").join("cirrus.db");
        let storage = SqliteStorage::open(make_config(db_path.to_str().unwrap()))
            .await
            .unwrap();
        assert!(db_path.exists(), "database file should be created");
        storage.close().await.unwrap();
    }

    #[tokio::test]
    async fn initialize_twice_returns_error() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("double_init.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));

        storage.initialize().await.unwrap();
        assert!(storage.initialize().await.is_err());
    }

    #[tokio::test]
    async fn operations_before_initialize_fail() {
        let storage = SqliteStorage::new(make_config("unused.db"));
        let err = storage
            .purge_expired(Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, CirrusError::Storage { .. }));
    }

    #[tokio::test]
    async fn store_and_ledger_share_database() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("shared.db");
        let storage = SqliteStorage::open(make_config(db_path.to_str().unwrap()))
            .await
            .unwrap();

        let triple = Triple::new(ServiceKind::KvTable, "111122223333", "eu-west-1");
        let stamp = RunStamp::new(RunId::generate(), now_millis(), Duration::days(90));
        let record = ResourceRecord::stamped(
            &triple,
            &stamp,
            DiscoveredResource::new("arn:aws:dynamodb:eu-west-1:111122223333:table/orders", Attributes::new()),
        );
        let outcome = storage
            .replace_triple(&triple, &stamp, vec![record])
            .await
            .unwrap();
        storage
            .record_success(&triple, stamp.collected_at, outcome.written as u64)
            .await
            .unwrap();

        let page = storage
            .query(&InventoryQuery::new(InventoryFilter::triple(&triple), None, None))
            .await
            .unwrap();
        assert_eq!(page.total, 1);

        let ledger = storage
            .freshness(&FreshnessFilter::triple(&triple))
            .await
            .unwrap();
        assert_eq!(ledger[0].resource_count, 1);
        assert_eq!(ledger[0].last_success_at, Some(stamp.collected_at));

        storage.close().await.unwrap();
    }
}
