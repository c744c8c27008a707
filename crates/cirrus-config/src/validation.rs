// SPDX-FileCopyrightText: 2026 Cirrus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as region name shape, cron syntax, and positive limits.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::diagnostic::ConfigError;
use crate::model::{AccountSource, CirrusConfig};

static REGION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z]{2}(-[a-z]+)+-\d+$").expect("valid regex"));

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &CirrusConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    if config.collection.regions.is_empty() {
        fail("collection.regions must list at least one region".to_string());
    }
    let mut seen = HashSet::new();
    for region in &config.collection.regions {
        if !REGION_PATTERN.is_match(region) {
            fail(format!(
                "collection.regions entry `{region}` is not a valid AWS region name"
            ));
        }
        if !seen.insert(region.as_str()) {
            fail(format!("collection.regions lists `{region}` more than once"));
        }
    }

    if config.collection.services.is_empty() {
        fail("collection.services must list at least one service".to_string());
    }

    if config.collection.max_concurrency == 0 {
        fail("collection.max_concurrency must be at least 1".to_string());
    }

    if config.collection.retention_days == 0 {
        fail("collection.retention_days must be at least 1".to_string());
    }

    if config.retry.max_attempts == 0 {
        fail("retry.max_attempts must be at least 1".to_string());
    }

    if config.retry.base_delay_ms > config.retry.max_delay_ms {
        fail(format!(
            "retry.base_delay_ms ({}) must not exceed retry.max_delay_ms ({})",
            config.retry.base_delay_ms, config.retry.max_delay_ms
        ));
    }

    if config.credentials.role_name.trim().is_empty() {
        fail("credentials.role_name must not be empty".to_string());
    }

    if !REGION_PATTERN.is_match(&config.credentials.home_region) {
        fail(format!(
            "credentials.home_region `{}` is not a valid AWS region name",
            config.credentials.home_region
        ));
    }

    if !(900..=43_200).contains(&config.credentials.duration_secs) {
        fail(format!(
            "credentials.duration_secs must be between 900 and 43200, got {}",
            config.credentials.duration_secs
        ));
    }

    if config.credentials.refresh_margin_secs >= u64::from(config.credentials.duration_secs) {
        fail(format!(
            "credentials.refresh_margin_secs ({}) must be shorter than credentials.duration_secs ({})",
            config.credentials.refresh_margin_secs, config.credentials.duration_secs
        ));
    }

    if config.accounts.source == AccountSource::Static
        && config
            .accounts
            .static_accounts
            .as_deref()
            .is_none_or(|s| s.trim().is_empty())
    {
        fail("accounts.static_accounts is required when accounts.source = \"static\"".to_string());
    }

    if config.schedule.cron.parse::<croner::Cron>().is_err() {
        fail(format!(
            "schedule.cron `{}` is not a valid cron expression",
            config.schedule.cron
        ));
    }

    if config.schedule.max_run_minutes == 0 {
        fail("schedule.max_run_minutes must be at least 1".to_string());
    }

    if config.prometheus.enabled
        && config
            .prometheus
            .listen_address
            .parse::<std::net::SocketAddr>()
            .is_err()
    {
        fail(format!(
            "prometheus.listen_address `{}` is not a valid socket address",
            config.prometheus.listen_address
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
