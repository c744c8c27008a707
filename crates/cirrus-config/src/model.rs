// SPDX-FileCopyrightText: 2026 Cirrus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Cirrus inventory engine.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use cirrus_core::ServiceKind;
use cirrus_core::types::DEFAULT_REGIONS;
use serde::{Deserialize, Serialize};

/// Top-level Cirrus configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CirrusConfig {
    /// Process identity and logging.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Where the list of target accounts comes from.
    #[serde(default)]
    pub accounts: AccountsConfig,

    /// Cross-account role assumption settings.
    #[serde(default)]
    pub credentials: CredentialsConfig,

    /// What to collect and how wide to fan out.
    #[serde(default)]
    pub collection: CollectionConfig,

    /// Backoff policy for throttled AWS calls.
    #[serde(default)]
    pub retry: RetryConfig,

    /// Daily sweep settings.
    #[serde(default)]
    pub schedule: ScheduleConfig,

    /// Prometheus exporter settings.
    #[serde(default)]
    pub prometheus: PrometheusConfig,
}

/// Process identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Name used in logs and role session names.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_service_name() -> String {
    "cirrus".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable write-ahead logging so readers never block on a sweep.
    #[serde(default = "default_true")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: true,
        }
    }
}

fn default_database_path() -> String {
    "cirrus.db".to_string()
}

fn default_true() -> bool {
    true
}

/// Account directory strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountSource {
    /// Active members of the AWS Organization.
    #[default]
    Organization,
    /// A configured `id:name,...` list.
    Static,
    /// Only the account that owns the ambient credential.
    Local,
}

/// Account directory configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AccountsConfig {
    #[serde(default)]
    pub source: AccountSource,

    /// Comma-separated `id:name` entries used by the static source.
    #[serde(default)]
    pub static_accounts: Option<String>,

    /// How long `list_accounts` results are reused by the read facade.
    #[serde(default = "default_account_cache_ttl")]
    pub cache_ttl_secs: u64,
}

impl Default for AccountsConfig {
    fn default() -> Self {
        Self {
            source: AccountSource::default(),
            static_accounts: None,
            cache_ttl_secs: default_account_cache_ttl(),
        }
    }
}

fn default_account_cache_ttl() -> u64 {
    300
}

/// Cross-account role assumption configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CredentialsConfig {
    /// Role assumed in every target account.
    #[serde(default = "default_role_name")]
    pub role_name: String,

    /// Pre-shared external id presented on assumption.
    #[serde(default)]
    pub external_id: Option<String>,

    /// Prefix of the role session name; the run id is appended.
    #[serde(default = "default_session_name_prefix")]
    pub session_name_prefix: String,

    /// Requested session duration in seconds.
    #[serde(default = "default_duration_secs")]
    pub duration_secs: u32,

    /// Cached credentials are refreshed once less than this remains.
    #[serde(default = "default_refresh_margin_secs")]
    pub refresh_margin_secs: u64,

    /// Region used for STS, Organizations and global services.
    #[serde(default = "default_home_region")]
    pub home_region: String,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            role_name: default_role_name(),
            external_id: None,
            session_name_prefix: default_session_name_prefix(),
            duration_secs: default_duration_secs(),
            refresh_margin_secs: default_refresh_margin_secs(),
            home_region: default_home_region(),
        }
    }
}

fn default_role_name() -> String {
    "InventoryReadRole".to_string()
}

fn default_session_name_prefix() -> String {
    "InventoryDashboard".to_string()
}

fn default_duration_secs() -> u32 {
    3600
}

fn default_refresh_margin_secs() -> u64 {
    300
}

fn default_home_region() -> String {
    "us-east-1".to_string()
}

/// Collection fan-out configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CollectionConfig {
    /// Supported regions for regional services.
    #[serde(default = "default_regions")]
    pub regions: Vec<String>,

    /// Services collected by a full scope.
    #[serde(default = "default_services")]
    pub services: Vec<ServiceKind>,

    /// Worker pool size: collector invocations running at once.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Days a record survives without being re-collected.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            regions: default_regions(),
            services: default_services(),
            max_concurrency: default_max_concurrency(),
            retention_days: default_retention_days(),
        }
    }
}

fn default_regions() -> Vec<String> {
    DEFAULT_REGIONS.iter().map(|r| r.to_string()).collect()
}

fn default_services() -> Vec<ServiceKind> {
    ServiceKind::ALL.to_vec()
}

fn default_max_concurrency() -> usize {
    10
}

fn default_retention_days() -> u32 {
    90
}

/// Backoff policy for throttled calls.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    /// Total attempts including the first call.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry; doubles on each attempt.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Upper bound for any single delay.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Randomize each delay between zero and its computed value.
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            jitter: true,
        }
    }
}

fn default_max_attempts() -> u32 {
    5
}

fn default_base_delay_ms() -> u64 {
    200
}

fn default_max_delay_ms() -> u64 {
    20_000
}

/// Daily sweep configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ScheduleConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Cron expression evaluated in UTC.
    #[serde(default = "default_cron")]
    pub cron: String,

    /// Wall-clock ceiling for one sweep.
    #[serde(default = "default_max_run_minutes")]
    pub max_run_minutes: u64,

    /// Skip triples that succeeded within this many minutes. 0 disables skipping.
    #[serde(default)]
    pub skip_fresh_within_minutes: u64,

    /// Purge expired records after each sweep.
    #[serde(default = "default_true")]
    pub purge_after_sweep: bool,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cron: default_cron(),
            max_run_minutes: default_max_run_minutes(),
            skip_fresh_within_minutes: 0,
            purge_after_sweep: true,
        }
    }
}

fn default_cron() -> String {
    "0 3 * * *".to_string()
}

fn default_max_run_minutes() -> u64 {
    60
}

/// Prometheus exporter configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PrometheusConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Address the metrics HTTP listener binds to.
    #[serde(default = "default_prometheus_listen")]
    pub listen_address: String,
}

impl Default for PrometheusConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_address: default_prometheus_listen(),
        }
    }
}

fn default_prometheus_listen() -> String {
    "127.0.0.1:9464".to_string()
}
