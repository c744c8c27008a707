// SPDX-FileCopyrightText: 2026 Cirrus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read-side query shapes for the inventory store and freshness ledger.

use serde::{Deserialize, Serialize};

use crate::types::{ResourceRecord, ServiceKind, Triple};

pub const DEFAULT_PAGE_SIZE: u32 = 50;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Which records of one service to read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryFilter {
    pub service: ServiceKind,
    pub account_ids: Option<Vec<String>>,
    pub regions: Option<Vec<String>>,
    /// Case-insensitive substring match against the resource id and attributes.
    pub search: Option<String>,
}

impl InventoryFilter {
    pub fn service(service: ServiceKind) -> Self {
        Self {
            service,
            account_ids: None,
            regions: None,
            search: None,
        }
    }

    /// Restricts the filter to exactly one triple.
    pub fn triple(triple: &Triple) -> Self {
        Self {
            service: triple.service,
            account_ids: Some(vec![triple.account_id.clone()]),
            regions: Some(vec![triple.region.clone()]),
            search: None,
        }
    }

    /// Normalizes the search term: trimmed, lowercased, and dropped when empty.
    pub fn search_term(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }
}

/// A filtered, paginated inventory read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryQuery {
    pub filter: InventoryFilter,
    page: u32,
    page_size: u32,
}

impl InventoryQuery {
    /// Page is 1-indexed and clamped to at least 1; page size is clamped to 1..=100.
    pub fn new(filter: InventoryFilter, page: Option<u32>, page_size: Option<u32>) -> Self {
        Self {
            filter,
            page: page.unwrap_or(1).max(1),
            page_size: page_size
                .unwrap_or(DEFAULT_PAGE_SIZE)
                .clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.page_size)
    }
}

/// One page of inventory results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryPage {
    pub items: Vec<ResourceRecord>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u64,
}

impl InventoryPage {
    pub fn new(items: Vec<ResourceRecord>, total: u64, query: &InventoryQuery) -> Self {
        let size = u64::from(query.page_size());
        Self {
            items,
            total,
            page: query.page(),
            page_size: query.page_size(),
            total_pages: total.div_ceil(size),
        }
    }
}

/// Optional narrowing of a freshness lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FreshnessFilter {
    pub service: Option<ServiceKind>,
    pub account_id: Option<String>,
    pub region: Option<String>,
}

impl FreshnessFilter {
    pub fn triple(triple: &Triple) -> Self {
        Self {
            service: Some(triple.service),
            account_id: Some(triple.account_id.clone()),
            region: Some(triple.region.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> InventoryFilter {
        InventoryFilter::service(ServiceKind::ComputeInstance)
    }

    #[test]
    fn pagination_defaults() {
        let q = InventoryQuery::new(filter(), None, None);
        assert_eq!(q.page(), 1);
        assert_eq!(q.page_size(), DEFAULT_PAGE_SIZE);
        assert_eq!(q.offset(), 0);
    }

    #[test]
    fn pagination_clamps_out_of_range_values() {
        let q = InventoryQuery::new(filter(), Some(0), Some(1000));
        assert_eq!(q.page(), 1);
        assert_eq!(q.page_size(), MAX_PAGE_SIZE);

        let q = InventoryQuery::new(filter(), Some(3), Some(0));
        assert_eq!(q.page_size(), 1);
        assert_eq!(q.offset(), 2);
    }

    #[test]
    fn total_pages_rounds_up() {
        let q = InventoryQuery::new(filter(), Some(1), Some(20));
        assert_eq!(InventoryPage::new(vec![], 41, &q).total_pages, 3);
        assert_eq!(InventoryPage::new(vec![], 0, &q).total_pages, 0);
    }

    #[test]
    fn blank_search_is_ignored() {
        let mut f = filter();
        f.search = Some("   ".into());
        assert_eq!(f.search_term(), None);
        f.search = Some(" Web-01 ".into());
        assert_eq!(f.search_term().as_deref(), Some("web-01"));
    }

    proptest::proptest! {
        #[test]
        fn pagination_always_in_bounds(page in proptest::option::of(0u32..10_000), size in proptest::option::of(0u32..10_000)) {
            let q = InventoryQuery::new(filter(), page, size);
            proptest::prop_assert!(q.page() >= 1);
            proptest::prop_assert!((1..=MAX_PAGE_SIZE).contains(&q.page_size()));
        }
    }
}
