// SPDX-FileCopyrightText: 2026 Cirrus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scripted collector for deterministic orchestration tests.
//!
//! `MockCollector` answers per (account, region) from a script. Unscripted
//! pairs return an empty listing. Calls are recorded, concurrency is
//! measured, and the collector can be paused to hold triples in flight.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use cirrus_core::{
    Attributes, CirrusError, Collector, Credential, DiscoveredResource, RegionCoverage,
    ServiceKind,
};
use tokio::sync::watch;

type Script = Arc<dyn Fn() -> Result<Vec<DiscoveredResource>, CirrusError> + Send + Sync>;

/// Build a resource with a `state` attribute, the way most collectors report one.
pub fn resource(id: &str, state: &str) -> DiscoveredResource {
    let mut attributes = Attributes::new();
    attributes.insert("state".into(), serde_json::Value::from(state));
    DiscoveredResource::new(id, attributes)
}

pub struct MockCollector {
    service: ServiceKind,
    coverage: RegionCoverage,
    scripts: Mutex<HashMap<(String, String), Script>>,
    calls: Mutex<Vec<(String, String)>>,
    call_count: watch::Sender<usize>,
    paused: watch::Sender<bool>,
    delay: Mutex<Option<Duration>>,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl MockCollector {
    pub fn new(service: ServiceKind) -> Self {
        Self::with_coverage(service, RegionCoverage::Regional)
    }

    /// A global collector answering under the `global` pseudo-region.
    pub fn global(service: ServiceKind, home_region: &str) -> Self {
        Self::with_coverage(
            service,
            RegionCoverage::Global {
                home_region: home_region.to_string(),
            },
        )
    }

    fn with_coverage(service: ServiceKind, coverage: RegionCoverage) -> Self {
        Self {
            service,
            coverage,
            scripts: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            call_count: watch::Sender::new(0),
            paused: watch::Sender::new(false),
            delay: Mutex::new(None),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
        }
    }

    fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
        mutex.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Answer `(account, region)` with resources carrying these ids.
    pub fn set_resources(&self, account: &str, region: &str, ids: &[&str]) {
        let resources: Vec<DiscoveredResource> =
            ids.iter().map(|id| resource(id, "running")).collect();
        self.set_script(account, region, move || Ok(resources.clone()));
    }

    /// Answer `(account, region)` with the error `make` builds.
    pub fn set_failure(
        &self,
        account: &str,
        region: &str,
        make: impl Fn() -> CirrusError + Send + Sync + 'static,
    ) {
        self.set_script(account, region, move || Err(make()));
    }

    pub fn set_script(
        &self,
        account: &str,
        region: &str,
        script: impl Fn() -> Result<Vec<DiscoveredResource>, CirrusError> + Send + Sync + 'static,
    ) {
        Self::lock(&self.scripts).insert((account.to_string(), region.to_string()), Arc::new(script));
    }

    /// Sleep this long inside every call.
    pub fn set_delay(&self, delay: Duration) {
        *Self::lock(&self.delay) = Some(delay);
    }

    /// Calls block after being recorded until [`resume`](Self::resume).
    pub fn pause(&self) {
        self.paused.send_replace(true);
    }

    pub fn resume(&self) {
        self.paused.send_replace(false);
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        Self::lock(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        *self.call_count.borrow()
    }

    /// Highest number of calls observed running at the same time.
    pub fn max_concurrent(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    /// Resolves once at least `n` calls have started.
    pub async fn wait_for_calls(&self, n: usize) {
        let mut rx = self.call_count.subscribe();
        let _ = rx.wait_for(|count| *count >= n).await;
    }
}

struct ActiveGuard<'a>(&'a AtomicUsize);

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Collector for MockCollector {
    fn service(&self) -> ServiceKind {
        self.service
    }

    fn coverage(&self) -> RegionCoverage {
        self.coverage.clone()
    }

    async fn collect(
        &self,
        credential: &Credential,
        region: &str,
    ) -> Result<Vec<DiscoveredResource>, CirrusError> {
        let account = credential.account_id.clone();
        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = ActiveGuard(&self.active);
        self.max_active.fetch_max(now_active, Ordering::SeqCst);

        Self::lock(&self.calls).push((account.clone(), region.to_string()));
        self.call_count.send_modify(|count| *count += 1);

        let mut paused = self.paused.subscribe();
        let _ = paused.wait_for(|p| !*p).await;
        let delay = *Self::lock(&self.delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let script = Self::lock(&self.scripts)
            .get(&(account, region.to_string()))
            .cloned();
        match script {
            Some(script) => script(),
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cirrus_core::CredentialOrigin;

    fn credential(account: &str) -> Credential {
        Credential::new(account, "AKID", "secret", None, None, CredentialOrigin::Ambient)
    }

    #[tokio::test]
    async fn scripted_and_default_answers() {
        let collector = MockCollector::new(ServiceKind::ComputeInstance);
        collector.set_resources("A", "us-east-1", &["i-1", "i-2"]);
        collector.set_failure("B", "us-east-1", || CirrusError::Internal("boom".into()));

        let found = collector.collect(&credential("A"), "us-east-1").await.unwrap();
        assert_eq!(found.len(), 2);
        assert!(collector.collect(&credential("B"), "us-east-1").await.is_err());
        assert!(collector.collect(&credential("A"), "eu-west-1").await.unwrap().is_empty());
        assert_eq!(collector.call_count(), 3);
        assert_eq!(collector.calls()[1], ("B".to_string(), "us-east-1".to_string()));
    }

    #[tokio::test]
    async fn pause_holds_calls() {
        let collector = Arc::new(MockCollector::new(ServiceKind::Network));
        collector.pause();
        let running = Arc::clone(&collector);
        let handle = tokio::spawn(async move { running.collect(&credential("A"), "us-east-1").await });
        collector.wait_for_calls(1).await;
        assert!(!handle.is_finished());
        collector.resume();
        assert!(handle.await.unwrap().unwrap().is_empty());
    }
}
