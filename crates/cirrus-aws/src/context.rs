// SPDX-FileCopyrightText: 2026 Cirrus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared AWS configuration context.
//!
//! The ambient SDK configuration is loaded once. Per-account, per-region
//! configurations are derived from it by swapping in a brokered credential
//! and a region, so no collector ever reloads the environment.

use std::sync::Arc;
use std::time::SystemTime;

use aws_config::retry::RetryConfig;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_credential_types::provider::SharedCredentialsProvider;
use cirrus_core::Credential;

/// Provider name stamped on every credential handed to an SDK client.
const PROVIDER_NAME: &str = "cirrus-broker";

/// Ambient AWS configuration plus the home region used for global calls.
#[derive(Clone)]
pub struct AwsContext {
    config: Arc<SdkConfig>,
    home_region: String,
}

impl AwsContext {
    /// Load the ambient configuration (environment, profiles, instance role).
    pub async fn load(home_region: &str) -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(home_region.to_string()))
            .load()
            .await;
        Self::from_sdk_config(config, home_region)
    }

    pub fn from_sdk_config(config: SdkConfig, home_region: &str) -> Self {
        Self {
            config: Arc::new(config),
            home_region: home_region.to_string(),
        }
    }

    /// The ambient configuration, pointed at the home region.
    pub fn sdk_config(&self) -> &SdkConfig {
        &self.config
    }

    pub fn home_region(&self) -> &str {
        &self.home_region
    }

    /// A configuration that signs with `credential` against `region`.
    ///
    /// SDK-level retries are disabled; throttling is retried by the caller's
    /// own policy so attempts are counted in one place.
    pub fn scoped(&self, credential: &Credential, region: &str) -> SdkConfig {
        let credentials = aws_credential_types::Credentials::new(
            credential.access_key_id.clone(),
            credential.secret_access_key().to_string(),
            credential.session_token().map(str::to_string),
            credential.expires_at.map(SystemTime::from),
            PROVIDER_NAME,
        );
        self.config
            .to_builder()
            .region(Region::new(region.to_string()))
            .credentials_provider(SharedCredentialsProvider::new(credentials))
            .retry_config(RetryConfig::disabled())
            .build()
    }

    pub fn sts_client(&self) -> aws_sdk_sts::Client {
        aws_sdk_sts::Client::new(self.sdk_config())
    }

    pub fn organizations_client(&self) -> aws_sdk_organizations::Client {
        aws_sdk_organizations::Client::new(self.sdk_config())
    }
}

impl std::fmt::Debug for AwsContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsContext")
            .field("home_region", &self.home_region)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cirrus_core::CredentialOrigin;

    fn context() -> AwsContext {
        let config = SdkConfig::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .build();
        AwsContext::from_sdk_config(config, "us-east-1")
    }

    #[test]
    fn scoped_config_swaps_region_and_credentials() {
        let credential = Credential::new(
            "111122223333",
            "ASIAEXAMPLE",
            "secret",
            Some("token".into()),
            None,
            CredentialOrigin::AssumedRole,
        );
        let scoped = context().scoped(&credential, "eu-west-1");
        assert_eq!(scoped.region().map(|r| r.as_ref()), Some("eu-west-1"));
        assert!(scoped.credentials_provider().is_some());
    }

    #[test]
    fn debug_omits_config() {
        let rendered = format!("{:?}", context());
        assert!(rendered.contains("us-east-1"));
        assert!(!rendered.contains("credentials"));
    }
}
