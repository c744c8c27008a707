// SPDX-FileCopyrightText: 2026 Cirrus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Service collector trait.

use async_trait::async_trait;

use crate::credential::Credential;
use crate::error::CirrusError;
use crate::types::{DiscoveredResource, RegionCoverage, ServiceKind};

/// Enumerates one kind of AWS resource in one account and region.
///
/// A collector follows continuation tokens until exhausted. If any page
/// fails after retries, the whole listing is returned as an error so that a
/// truncated listing never replaces a complete one. Regions the service does
/// not serve yield an empty listing, not an error.
#[async_trait]
pub trait Collector: Send + Sync + 'static {
    /// The resource kind this collector produces.
    fn service(&self) -> ServiceKind;

    /// How this collector maps onto regions.
    fn coverage(&self) -> RegionCoverage {
        RegionCoverage::Regional
    }

    /// Lists every resource visible to `credential` in `region`.
    async fn collect(
        &self,
        credential: &Credential,
        region: &str,
    ) -> Result<Vec<DiscoveredResource>, CirrusError>;
}
