// SPDX-FileCopyrightText: 2026 Cirrus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for engine integration tests.
//!
//! `TestHarness` assembles a temp SQLite store, a mock account directory,
//! mock credentials and one scripted collector per service. Tests build the
//! orchestrator on top of these parts.

use std::collections::BTreeMap;
use std::sync::Arc;

use cirrus_config::model::StorageConfig;
use cirrus_core::{
    AccountInfo, CirrusError, Collector, CollectorRegistry, FreshnessLedger, InventoryStore,
    ServiceKind,
};
use cirrus_storage::SqliteStorage;

use crate::mock_collector::MockCollector;
use crate::mock_directory::{MockCredentials, MockDirectory};

/// Home region used for global collectors in tests.
pub const TEST_HOME_REGION: &str = "us-east-1";

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    accounts: Vec<AccountInfo>,
    regions: Vec<String>,
    services: Vec<ServiceKind>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            accounts: vec![AccountInfo::new("111111111111", "primary")],
            regions: vec![TEST_HOME_REGION.to_string()],
            services: ServiceKind::ALL.to_vec(),
        }
    }

    /// Accounts the mock directory lists, as (id, name).
    pub fn with_accounts(mut self, accounts: &[(&str, &str)]) -> Self {
        self.accounts = accounts
            .iter()
            .map(|(id, name)| AccountInfo::new(*id, *name))
            .collect();
        self
    }

    /// The supported region list.
    pub fn with_regions(mut self, regions: &[&str]) -> Self {
        self.regions = regions.iter().map(|r| r.to_string()).collect();
        self
    }

    /// Services with a registered collector. IAM roles register as global.
    pub fn with_services(mut self, services: &[ServiceKind]) -> Self {
        self.services = services.to_vec();
        self
    }

    /// Build the test harness, creating all required subsystems.
    pub async fn build(self) -> Result<TestHarness, CirrusError> {
        let temp_dir =
            tempfile::TempDir::new().map_err(|e| CirrusError::Storage { source: e.into() })?;
        let db_path = temp_dir.path().join("test.db");

        let storage = SqliteStorage::open(StorageConfig {
            database_path: db_path.to_string_lossy().to_string(),
            wal_mode: true,
        })
        .await?;
        let storage = Arc::new(storage);

        let mut collectors = BTreeMap::new();
        let mut registry = CollectorRegistry::new();
        for service in self.services {
            let collector = Arc::new(if service == ServiceKind::IamRole {
                MockCollector::global(service, TEST_HOME_REGION)
            } else {
                MockCollector::new(service)
            });
            registry.register(Arc::clone(&collector) as Arc<dyn Collector>);
            collectors.insert(service, collector);
        }

        Ok(TestHarness {
            storage,
            directory: Arc::new(MockDirectory::new(self.accounts)),
            credentials: Arc::new(MockCredentials::new()),
            collectors,
            registry,
            regions: self.regions,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete test environment with mock adapters and temp storage.
pub struct TestHarness {
    storage: Arc<SqliteStorage>,
    directory: Arc<MockDirectory>,
    credentials: Arc<MockCredentials>,
    collectors: BTreeMap<ServiceKind, Arc<MockCollector>>,
    registry: CollectorRegistry,
    regions: Vec<String>,
    /// Keep temp dir alive for the test duration.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    pub fn storage(&self) -> &Arc<SqliteStorage> {
        &self.storage
    }

    pub fn store(&self) -> Arc<dyn InventoryStore> {
        Arc::clone(&self.storage) as Arc<dyn InventoryStore>
    }

    pub fn ledger(&self) -> Arc<dyn FreshnessLedger> {
        Arc::clone(&self.storage) as Arc<dyn FreshnessLedger>
    }

    pub fn directory(&self) -> &Arc<MockDirectory> {
        &self.directory
    }

    pub fn credentials(&self) -> &Arc<MockCredentials> {
        &self.credentials
    }

    pub fn registry(&self) -> CollectorRegistry {
        self.registry.clone()
    }

    pub fn regions(&self) -> &[String] {
        &self.regions
    }

    /// The scripted collector for `service`.
    ///
    /// # Panics
    ///
    /// When the harness was built without that service.
    pub fn collector(&self, service: ServiceKind) -> &Arc<MockCollector> {
        match self.collectors.get(&service) {
            Some(collector) => collector,
            None => panic!("harness has no collector for {service}"),
        }
    }
}
