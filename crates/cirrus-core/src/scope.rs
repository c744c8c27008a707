// SPDX-FileCopyrightText: 2026 Cirrus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collection scopes: which services, accounts and regions a run targets.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::types::ServiceKind;

/// Either everything known, or an explicit subset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Selection<T: Ord> {
    All,
    Only(BTreeSet<T>),
}

impl<T: Ord> Selection<T> {
    /// Builds a selection from an optional filter. `None` means all.
    pub fn from_filter<I>(filter: Option<I>) -> Self
    where
        I: IntoIterator<Item = T>,
    {
        match filter {
            Some(items) => Self::Only(items.into_iter().collect()),
            None => Self::All,
        }
    }

    pub fn contains(&self, item: &T) -> bool {
        match self {
            Self::All => true,
            Self::Only(items) => items.contains(item),
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }
}

/// An in-memory description of one orchestration run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionScope {
    pub services: Selection<ServiceKind>,
    pub accounts: Selection<String>,
    pub regions: Selection<String>,
}

impl CollectionScope {
    /// All services across all known accounts and all supported regions.
    pub fn full() -> Self {
        Self {
            services: Selection::All,
            accounts: Selection::All,
            regions: Selection::All,
        }
    }

    /// Scope for an on-demand request. Absent filters mean "all".
    pub fn on_demand(service: Option<ServiceKind>, account_ids: Option<Vec<String>>) -> Self {
        Self {
            services: Selection::from_filter(service.map(|s| [s])),
            accounts: Selection::from_filter(account_ids),
            regions: Selection::All,
        }
    }

    pub fn with_regions<I, S>(mut self, regions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.regions = Selection::Only(regions.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_accounts<I, S>(mut self, accounts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.accounts = Selection::Only(accounts.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_services<I>(mut self, services: I) -> Self
    where
        I: IntoIterator<Item = ServiceKind>,
    {
        self.services = Selection::Only(services.into_iter().collect());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_filters_mean_all() {
        let scope = CollectionScope::on_demand(None, None);
        assert_eq!(scope, CollectionScope::full());
    }

    #[test]
    fn on_demand_filters_narrow_scope() {
        let scope = CollectionScope::on_demand(
            Some(ServiceKind::ObjectStore),
            Some(vec!["111".into(), "222".into(), "111".into()]),
        );
        assert!(scope.services.contains(&ServiceKind::ObjectStore));
        assert!(!scope.services.contains(&ServiceKind::ComputeInstance));
        match &scope.accounts {
            Selection::Only(ids) => assert_eq!(ids.len(), 2),
            Selection::All => panic!("accounts should be narrowed"),
        }
        assert!(scope.regions.is_all());
    }
}
