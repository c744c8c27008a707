// SPDX-FileCopyrightText: 2026 Cirrus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wiring of storage, AWS plumbing, collectors and the engine.

use std::sync::Arc;
use std::time::Duration;

use cirrus_aws::{
    AwsContext, BrokerSettings, CredentialBroker, StsCredentialSource, caller_account_id,
    directory_from_config,
};
use cirrus_collectors::{CollectorContext, builtin_registry};
use cirrus_config::CirrusConfig;
use cirrus_core::{AccountDirectory, CirrusError, FreshnessLedger, InventoryStore};
use cirrus_engine::{
    InventoryApi, Orchestrator, OrchestratorSettings, RefreshTrigger, SweepSettings,
};
use cirrus_resilience::RetryPolicy;
use cirrus_storage::SqliteStorage;
use tracing::{info, warn};

/// Opens the configured SQLite database. Read commands need nothing else.
pub async fn open_storage(config: &CirrusConfig) -> Result<Arc<SqliteStorage>, CirrusError> {
    Ok(Arc::new(SqliteStorage::open(config.storage.clone()).await?))
}

/// Ambient AWS configuration plus the configured account directory.
pub async fn directory(config: &CirrusConfig) -> (AwsContext, Arc<dyn AccountDirectory>) {
    let aws = AwsContext::load(&config.credentials.home_region).await;
    let directory = directory_from_config(
        &config.accounts,
        &aws,
        RetryPolicy::from_config(&config.retry),
    );
    (aws, directory)
}

/// Everything needed to collect.
pub struct Stack {
    pub storage: Arc<SqliteStorage>,
    pub trigger: Arc<RefreshTrigger>,
    pub api: InventoryApi,
}

impl Stack {
    pub fn store(&self) -> Arc<dyn InventoryStore> {
        Arc::clone(&self.storage) as Arc<dyn InventoryStore>
    }
}

pub async fn build(config: &CirrusConfig) -> Result<Stack, CirrusError> {
    let storage = open_storage(config).await?;
    let store = Arc::clone(&storage) as Arc<dyn InventoryStore>;
    let ledger = Arc::clone(&storage) as Arc<dyn FreshnessLedger>;

    let (aws, directory) = directory(config).await;
    let policy = RetryPolicy::from_config(&config.retry);

    // Without an ambient identity every account goes through role assumption.
    let local_account_id = match caller_account_id(&aws).await {
        Ok(account_id) => Some(account_id),
        Err(e) => {
            warn!(error = %e, "could not resolve the ambient account, assuming roles everywhere");
            None
        }
    };

    let broker = CredentialBroker::new(
        StsCredentialSource::new(aws.clone()),
        BrokerSettings::from_config(&config.credentials),
        policy.clone(),
    );
    let collectors = CollectorContext::new(aws.clone(), policy);
    let registry = builtin_registry(&config.collection.services, &collectors, aws.home_region());
    info!(
        directory = directory.name(),
        collectors = registry.len(),
        regions = config.collection.regions.len(),
        local_account = local_account_id.as_deref().unwrap_or("unknown"),
        "collection stack ready"
    );

    let orchestrator = Orchestrator::new(
        Arc::clone(&directory),
        Arc::new(broker),
        registry,
        Arc::clone(&store),
        Arc::clone(&ledger),
        OrchestratorSettings::from_config(&config.collection, local_account_id),
    );
    let trigger = Arc::new(RefreshTrigger::new(
        orchestrator,
        SweepSettings::from_config(&config.schedule),
    ));
    let api = InventoryApi::new(
        store,
        ledger,
        directory,
        Arc::clone(&trigger),
        Duration::from_secs(config.accounts.cache_ttl_secs),
    );

    Ok(Stack {
        storage,
        trigger,
        api,
    })
}
