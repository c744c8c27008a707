// SPDX-FileCopyrightText: 2026 Cirrus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./cirrus.toml` > `~/.config/cirrus/cirrus.toml` > `/etc/cirrus/cirrus.toml`
//! with environment variable overrides via `CIRRUS_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::CirrusConfig;

/// Top-level sections, used to map `CIRRUS_SECTION_KEY` onto `section.key`.
const SECTIONS: &[&str] = &[
    "service",
    "storage",
    "accounts",
    "credentials",
    "collection",
    "retry",
    "schedule",
    "prometheus",
];

pub(crate) const SYSTEM_CONFIG_PATH: &str = "/etc/cirrus/cirrus.toml";
pub(crate) const LOCAL_CONFIG_PATH: &str = "cirrus.toml";

pub(crate) fn user_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("cirrus/cirrus.toml"))
        .unwrap_or_default()
}

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/cirrus/cirrus.toml` (system-wide)
/// 3. `~/.config/cirrus/cirrus.toml` (user XDG config)
/// 4. `./cirrus.toml` (local directory)
/// 5. `CIRRUS_*` environment variables
pub fn load_config() -> Result<CirrusConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<CirrusConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CirrusConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<CirrusConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CirrusConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading (exposed for diagnostic use).
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(CirrusConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(user_config_path()))
        .merge(Toml::file(LOCAL_CONFIG_PATH))
        .merge(env_provider())
}

/// Create the environment variable provider.
///
/// Only the first underscore after a known section name becomes a dot, so
/// `CIRRUS_CREDENTIALS_EXTERNAL_ID` maps to `credentials.external_id` and
/// not `credentials.external.id`.
fn env_provider() -> Env {
    Env::prefixed("CIRRUS_").map(|key| map_env_key(key.as_str()).into())
}

pub(crate) fn map_env_key(key: &str) -> String {
    for section in SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|rest| rest.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_map_first_underscore_only() {
        assert_eq!(
            map_env_key("credentials_external_id"),
            "credentials.external_id"
        );
        assert_eq!(
            map_env_key("accounts_static_accounts"),
            "accounts.static_accounts"
        );
        assert_eq!(
            map_env_key("schedule_max_run_minutes"),
            "schedule.max_run_minutes"
        );
    }

    #[test]
    fn unknown_section_is_left_alone() {
        assert_eq!(map_env_key("logging_level"), "logging_level");
    }
}
