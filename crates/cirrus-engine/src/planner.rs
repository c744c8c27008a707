// SPDX-FileCopyrightText: 2026 Cirrus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Expansion of a [`CollectionScope`] into concrete triples.

use std::collections::BTreeSet;

use cirrus_core::{
    AccountInfo, CollectionScope, CollectorRegistry, GLOBAL_REGION, RegionCoverage, Selection,
    Triple,
};
use tracing::warn;

/// Expands `scope` against the known accounts and supported regions.
///
/// - Services without a registered collector are skipped.
/// - Global services get exactly one triple in the `global` pseudo-region,
///   whatever the region selection.
/// - Requested regions outside `supported_regions` are dropped with a warning.
/// - Requested accounts the directory does not know are dropped with a warning.
///
/// The result is sorted and free of duplicates.
pub fn expand_scope(
    scope: &CollectionScope,
    accounts: &[AccountInfo],
    registry: &CollectorRegistry,
    supported_regions: &[String],
) -> Vec<Triple> {
    let regions: Vec<&str> = match &scope.regions {
        Selection::All => supported_regions.iter().map(String::as_str).collect(),
        Selection::Only(requested) => {
            for region in requested.iter().filter(|r| !supported_regions.contains(r)) {
                warn!(region = %region, "requested region is not supported, dropping");
            }
            supported_regions
                .iter()
                .filter(|r| requested.contains(*r))
                .map(String::as_str)
                .collect()
        }
    };

    let known: BTreeSet<&str> = accounts.iter().map(|a| a.account_id.as_str()).collect();
    if let Selection::Only(requested) = &scope.accounts {
        for account in requested.iter().filter(|a| !known.contains(a.as_str())) {
            warn!(account_id = %account, "requested account is not in the directory, dropping");
        }
    }
    let targets: Vec<&str> = known
        .into_iter()
        .filter(|id| scope.accounts.contains(&(*id).to_string()))
        .collect();

    let mut triples = BTreeSet::new();
    for service in registry.services() {
        if !scope.services.contains(&service) {
            continue;
        }
        let Some(coverage) = registry.coverage(service) else {
            continue;
        };
        for account in &targets {
            match coverage {
                RegionCoverage::Global { .. } => {
                    triples.insert(Triple::new(service, *account, GLOBAL_REGION));
                }
                RegionCoverage::Regional => {
                    for region in &regions {
                        triples.insert(Triple::new(service, *account, *region));
                    }
                }
            }
        }
    }

    if let Selection::Only(requested) = &scope.services {
        for service in requested.iter().filter(|s| registry.coverage(**s).is_none()) {
            warn!(%service, "no collector registered for requested service, dropping");
        }
    }

    triples.into_iter().collect()
}
