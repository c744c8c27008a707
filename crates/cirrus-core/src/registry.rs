// SPDX-FileCopyrightText: 2026 Cirrus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Static lookup table of service collectors.
//!
//! Collectors are registered once at startup and looked up by
//! [`ServiceKind`]. Registering a second collector for the same service
//! replaces the first.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::CirrusError;
use crate::traits::Collector;
use crate::types::{RegionCoverage, ServiceKind};

/// Registry of collectors keyed by service.
#[derive(Default, Clone)]
pub struct CollectorRegistry {
    collectors: BTreeMap<ServiceKind, Arc<dyn Collector>>,
}

impl CollectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a collector under the service it reports.
    pub fn register(&mut self, collector: Arc<dyn Collector>) {
        let service = collector.service();
        if self.collectors.insert(service, collector).is_some() {
            tracing::warn!(%service, "replacing previously registered collector");
        }
    }

    pub fn get(&self, service: ServiceKind) -> Result<Arc<dyn Collector>, CirrusError> {
        self.collectors
            .get(&service)
            .cloned()
            .ok_or(CirrusError::UnknownService(service))
    }

    pub fn coverage(&self, service: ServiceKind) -> Option<RegionCoverage> {
        self.collectors.get(&service).map(|c| c.coverage())
    }

    /// Registered services in stable order.
    pub fn services(&self) -> Vec<ServiceKind> {
        self.collectors.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.collectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collectors.is_empty()
    }
}

impl std::fmt::Debug for CollectorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectorRegistry")
            .field("services", &self.services())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::Credential;
    use crate::types::DiscoveredResource;
    use async_trait::async_trait;

    struct Fixed(ServiceKind);

    #[async_trait]
    impl Collector for Fixed {
        fn service(&self) -> ServiceKind {
            self.0
        }

        async fn collect(
            &self,
            _credential: &Credential,
            _region: &str,
        ) -> Result<Vec<DiscoveredResource>, CirrusError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn lookup_by_service() {
        let mut registry = CollectorRegistry::new();
        registry.register(Arc::new(Fixed(ServiceKind::KvTable)));
        registry.register(Arc::new(Fixed(ServiceKind::ComputeInstance)));

        assert_eq!(registry.len(), 2);
        assert_eq!(
            registry.services(),
            vec![ServiceKind::ComputeInstance, ServiceKind::KvTable]
        );
        assert!(registry.get(ServiceKind::KvTable).is_ok());
        assert!(matches!(
            registry.get(ServiceKind::Network),
            Err(CirrusError::UnknownService(ServiceKind::Network))
        ));
        assert_eq!(
            registry.coverage(ServiceKind::KvTable),
            Some(RegionCoverage::Regional)
        );
    }

    #[test]
    fn re_registering_replaces() {
        let mut registry = CollectorRegistry::new();
        registry.register(Arc::new(Fixed(ServiceKind::KvTable)));
        registry.register(Arc::new(Fixed(ServiceKind::KvTable)));
        assert_eq!(registry.len(), 1);
    }
}
