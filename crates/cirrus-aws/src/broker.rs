// SPDX-FileCopyrightText: 2026 Cirrus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Credential broker: per-account short-lived credentials with caching.
//!
//! Each account has its own async slot. Concurrent callers for the same
//! account queue on that slot, so at most one role assumption per account is
//! in flight and the rest reuse its result. Different accounts never block
//! each other.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use cirrus_config::CredentialsConfig;
use cirrus_core::{CirrusError, Credential, CredentialProvider, RunId};
use cirrus_resilience::{retry, RetryError, RetryPolicy, Sleeper, TokioSleeper};
use tracing::{debug, info, warn};

use crate::error::AwsError;
use crate::sts::{AssumeRoleRequest, CredentialSource};

/// STS limit on `RoleSessionName`.
const MAX_SESSION_NAME_LEN: usize = 64;

type Slot = Arc<tokio::sync::Mutex<Option<Arc<Credential>>>>;

/// Role and session settings for cross-account assumption.
#[derive(Debug, Clone)]
pub struct BrokerSettings {
    pub role_name: String,
    pub external_id: Option<String>,
    pub session_name_prefix: String,
    pub duration_secs: u32,
    pub refresh_margin: chrono::Duration,
}

impl BrokerSettings {
    pub fn from_config(config: &CredentialsConfig) -> Self {
        Self {
            role_name: config.role_name.clone(),
            external_id: config
                .external_id
                .clone()
                .filter(|id| !id.trim().is_empty()),
            session_name_prefix: config.session_name_prefix.clone(),
            duration_secs: config.duration_secs,
            refresh_margin: chrono::Duration::seconds(
                i64::try_from(config.refresh_margin_secs).unwrap_or(i64::MAX),
            ),
        }
    }

    pub fn role_arn(&self, account_id: &str) -> String {
        format!("arn:aws:iam::{account_id}:role/{}", self.role_name)
    }

    /// `{prefix}-{run_id}`, limited to the characters and length STS accepts.
    pub fn session_name(&self, run_id: &RunId) -> String {
        format!("{}-{}", self.session_name_prefix, run_id)
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || "+=,.@_-".contains(c) {
                    c
                } else {
                    '-'
                }
            })
            .take(MAX_SESSION_NAME_LEN)
            .collect()
    }
}

/// Caching, single-flight credential broker over a [`CredentialSource`].
pub struct CredentialBroker<S> {
    source: S,
    settings: BrokerSettings,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
    slots: Mutex<HashMap<String, Slot>>,
}

impl<S: CredentialSource> CredentialBroker<S> {
    pub fn new(source: S, settings: BrokerSettings, policy: RetryPolicy) -> Self {
        Self::with_sleeper(source, settings, policy, Arc::new(TokioSleeper))
    }

    pub fn with_sleeper(
        source: S,
        settings: BrokerSettings,
        policy: RetryPolicy,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            source,
            settings,
            policy,
            sleeper,
            slots: Mutex::new(HashMap::new()),
        }
    }

    fn slot(&self, account_id: &str) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slots.entry(account_id.to_string()).or_default())
    }

    /// Drop every cached credential.
    pub fn clear(&self) {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    async fn fetch(
        &self,
        account_id: &str,
        is_local: bool,
        run_id: &RunId,
    ) -> Result<Credential, CirrusError> {
        if is_local {
            return self
                .source
                .ambient(account_id)
                .await
                .map_err(CirrusError::from);
        }

        let request = AssumeRoleRequest {
            account_id: account_id.to_string(),
            role_arn: self.settings.role_arn(account_id),
            session_name: self.settings.session_name(run_id),
            external_id: self.settings.external_id.clone(),
            duration_secs: self.settings.duration_secs,
        };
        let result = retry(&self.policy, self.sleeper.as_ref(), "sts:AssumeRole", || {
            self.source.assume_role(&request)
        })
        .await;

        let outcome = match &result {
            Ok(_) => "ok",
            Err(e) => match e.last() {
                AwsError::AccessDenied { .. } => "denied",
                AwsError::NotFound { .. } => "not_found",
                AwsError::Throttled { .. } => "throttled",
                _ => "error",
            },
        };
        metrics::counter!("cirrus_assume_role_total", "outcome" => outcome).increment(1);

        result.map_err(|e| assume_role_error(account_id, &request.role_arn, e))
    }
}

/// Map a failed assumption into the broker's error taxonomy.
fn assume_role_error(account_id: &str, role_arn: &str, err: RetryError<AwsError>) -> CirrusError {
    let attempts = err.attempts();
    let throttled = matches!(err, RetryError::Exhausted { .. })
        && matches!(err.last(), AwsError::Throttled { .. });
    let err = err.into_inner();
    warn!(account_id, role_arn, attempts, error = %err, "role assumption failed");

    if throttled {
        return CirrusError::ThrottleExceeded {
            attempts,
            message: err.message().to_string(),
        };
    }
    match err {
        AwsError::NotFound { message, .. } => CirrusError::AssumeRoleNotFound {
            account_id: account_id.to_string(),
            message,
        },
        AwsError::AccessDenied { message, .. } if looks_missing(&message) => {
            CirrusError::AssumeRoleNotFound {
                account_id: account_id.to_string(),
                message,
            }
        }
        AwsError::AccessDenied { message, .. } => CirrusError::AssumeRoleDenied {
            account_id: account_id.to_string(),
            message,
        },
        other => other.into(),
    }
}

/// STS reports a missing role as access denied; the message still says so.
fn looks_missing(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("does not exist") || lower.contains("cannot be found")
}

#[async_trait]
impl<S: CredentialSource> CredentialProvider for CredentialBroker<S> {
    async fn credential(
        &self,
        account_id: &str,
        is_local: bool,
        run_id: &RunId,
    ) -> Result<Arc<Credential>, CirrusError> {
        let slot = self.slot(account_id);
        let mut cached = slot.lock().await;

        if let Some(credential) = cached.as_ref()
            && credential.is_fresh(Utc::now(), self.settings.refresh_margin)
        {
            debug!(account_id, "credential cache hit");
            return Ok(Arc::clone(credential));
        }

        let credential = Arc::new(self.fetch(account_id, is_local, run_id).await?);
        info!(
            account_id,
            origin = ?credential.origin,
            expires_at = ?credential.expires_at,
            "credential issued"
        );
        *cached = Some(Arc::clone(&credential));
        Ok(credential)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cirrus_core::CredentialOrigin;
    use cirrus_resilience::RecordingSleeper;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct FakeSource {
        assumed: AtomicUsize,
        ambient: AtomicUsize,
        lifetime_secs: i64,
        failures: Mutex<Vec<AwsError>>,
        requests: Mutex<Vec<AssumeRoleRequest>>,
    }

    impl FakeSource {
        fn lasting(secs: i64) -> Self {
            Self {
                lifetime_secs: secs,
                ..Default::default()
            }
        }

        fn failing_with(errors: Vec<AwsError>) -> Self {
            Self {
                lifetime_secs: 3600,
                failures: Mutex::new(errors),
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl CredentialSource for FakeSource {
        async fn assume_role(&self, request: &AssumeRoleRequest) -> Result<Credential, AwsError> {
            self.assumed.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push(request.clone());
            tokio::time::sleep(Duration::from_millis(20)).await;
            if let Some(err) = self.failures.lock().unwrap().pop() {
                return Err(err);
            }
            Ok(Credential::new(
                request.account_id.clone(),
                "ASIAFAKE",
                "super-secret-value",
                Some("session-token".into()),
                Some(Utc::now() + chrono::Duration::seconds(self.lifetime_secs)),
                CredentialOrigin::AssumedRole,
            ))
        }

        async fn ambient(&self, account_id: &str) -> Result<Credential, AwsError> {
            self.ambient.fetch_add(1, Ordering::SeqCst);
            Ok(Credential::new(
                account_id,
                "AKIAFAKE",
                "ambient-secret",
                None,
                None,
                CredentialOrigin::Ambient,
            ))
        }
    }

    fn settings() -> BrokerSettings {
        BrokerSettings {
            role_name: "InventoryReadRole".into(),
            external_id: Some("ext-123".into()),
            session_name_prefix: "InventoryDashboard".into(),
            duration_secs: 3600,
            refresh_margin: chrono::Duration::seconds(300),
        }
    }

    fn broker(source: FakeSource) -> CredentialBroker<FakeSource> {
        let policy = RetryPolicy {
            max_attempts: 3,
            ..RetryPolicy::default()
        };
        CredentialBroker::with_sleeper(source, settings(), policy, Arc::new(RecordingSleeper::new()))
    }

    fn denied() -> AwsError {
        AwsError::AccessDenied {
            code: "AccessDenied".into(),
            message: "not authorized to perform sts:AssumeRole".into(),
        }
    }

    fn throttled() -> AwsError {
        AwsError::Throttled {
            code: "Throttling".into(),
            message: "Rate exceeded".into(),
        }
    }

    #[test]
    fn role_arn_and_session_name() {
        let s = settings();
        assert_eq!(
            s.role_arn("111122223333"),
            "arn:aws:iam::111122223333:role/InventoryReadRole"
        );
        let run = RunId("0123456789abcdef0123456789abcdef".into());
        assert_eq!(
            s.session_name(&run),
            "InventoryDashboard-0123456789abcdef0123456789abcdef"
        );

        let long = BrokerSettings {
            session_name_prefix: "a prefix/that is far too long for sts to accept".into(),
            ..settings()
        };
        let name = long.session_name(&run);
        assert_eq!(name.len(), MAX_SESSION_NAME_LEN);
        assert!(name.starts_with("a-prefix-that"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_requests_share_one_assumption() {
        let broker = Arc::new(broker(FakeSource::lasting(3600)));
        let run = RunId::generate();

        let mut handles = Vec::new();
        for _ in 0..10 {
            let broker = Arc::clone(&broker);
            let run = run.clone();
            handles.push(tokio::spawn(async move {
                broker.credential("111122223333", false, &run).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(broker.source.assumed.load(Ordering::SeqCst), 1);
        let requests = broker.source.requests.lock().unwrap();
        assert_eq!(requests[0].external_id.as_deref(), Some("ext-123"));
        assert_eq!(requests[0].duration_secs, 3600);
    }

    #[tokio::test]
    async fn accounts_are_cached_independently() {
        let broker = broker(FakeSource::lasting(3600));
        let run = RunId::generate();
        broker.credential("111", false, &run).await.unwrap();
        broker.credential("222", false, &run).await.unwrap();
        broker.credential("111", false, &run).await.unwrap();
        assert_eq!(broker.source.assumed.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn credential_inside_refresh_margin_is_renewed() {
        // Valid for two minutes; the margin is five.
        let broker = broker(FakeSource::lasting(120));
        let run = RunId::generate();
        broker.credential("111", false, &run).await.unwrap();
        broker.credential("111", false, &run).await.unwrap();
        assert_eq!(broker.source.assumed.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn local_account_uses_ambient_credential() {
        let broker = broker(FakeSource::lasting(3600));
        let credential = broker
            .credential("999", true, &RunId::generate())
            .await
            .unwrap();
        assert_eq!(credential.origin, CredentialOrigin::Ambient);
        assert_eq!(broker.source.assumed.load(Ordering::SeqCst), 0);
        assert_eq!(broker.source.ambient.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn denial_maps_to_assume_role_denied_and_is_not_cached() {
        let broker = broker(FakeSource::failing_with(vec![denied(), denied()]));
        let run = RunId::generate();

        let err = broker.credential("222", false, &run).await.unwrap_err();
        assert!(matches!(err, CirrusError::AssumeRoleDenied { ref account_id, .. } if account_id == "222"));

        // Second call asks STS again.
        let err = broker.credential("222", false, &run).await.unwrap_err();
        assert!(matches!(err, CirrusError::AssumeRoleDenied { .. }));
        assert_eq!(broker.source.assumed.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn missing_role_maps_to_not_found() {
        let missing = AwsError::AccessDenied {
            code: "AccessDenied".into(),
            message: "Role arn:aws:iam::222:role/InventoryReadRole does not exist".into(),
        };
        let broker = broker(FakeSource::failing_with(vec![missing]));
        let err = broker
            .credential("222", false, &RunId::generate())
            .await
            .unwrap_err();
        assert!(matches!(err, CirrusError::AssumeRoleNotFound { .. }));
    }

    #[tokio::test]
    async fn throttling_is_retried_then_succeeds() {
        let broker = broker(FakeSource::failing_with(vec![throttled(), throttled()]));
        broker
            .credential("333", false, &RunId::generate())
            .await
            .unwrap();
        assert_eq!(broker.source.assumed.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn persistent_throttling_is_throttle_exceeded() {
        let broker = broker(FakeSource::failing_with(vec![
            throttled(),
            throttled(),
            throttled(),
        ]));
        let err = broker
            .credential("333", false, &RunId::generate())
            .await
            .unwrap_err();
        assert!(matches!(err, CirrusError::ThrottleExceeded { attempts: 3, .. }));
    }

    #[tokio::test]
    async fn persistent_network_failure_is_not_throttling() {
        let transient = || AwsError::Transient {
            message: "dispatch failure: connection reset".into(),
        };
        let broker = broker(FakeSource::failing_with(vec![
            transient(),
            transient(),
            transient(),
        ]));
        let err = broker
            .credential("444", false, &RunId::generate())
            .await
            .unwrap_err();
        assert_eq!(broker.source.assumed.load(Ordering::SeqCst), 3);
        assert!(
            matches!(&err, CirrusError::Aws { message, .. } if message.contains("connection reset")),
            "unexpected error: {err:?}"
        );
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn secrets_never_reach_logs() {
        let broker = broker(FakeSource::lasting(3600));
        let credential = broker
            .credential("111", false, &RunId::generate())
            .await
            .unwrap();
        assert_eq!(credential.secret_access_key(), "super-secret-value");
        assert!(logs_contain("credential issued"));
        assert!(!logs_contain("super-secret-value"));
        assert!(!logs_contain("session-token"));
    }
}
