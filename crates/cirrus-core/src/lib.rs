// SPDX-FileCopyrightText: 2026 Cirrus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Cirrus inventory engine.
//!
//! This crate provides the data model, error taxonomy, and trait seams used
//! throughout the workspace. Collectors, credential brokers, account
//! directories and stores all implement traits defined here.

pub mod credential;
pub mod error;
pub mod query;
pub mod registry;
pub mod scope;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use credential::{Credential, CredentialOrigin};
pub use error::{CirrusError, FailureKind};
pub use query::{FreshnessFilter, InventoryFilter, InventoryPage, InventoryQuery};
pub use registry::CollectorRegistry;
pub use scope::{CollectionScope, Selection};
pub use types::{
    now_millis, AccountInfo, Attributes, DiscoveredResource, FreshnessRecord, GLOBAL_REGION,
    RegionCoverage, ResourceRecord, RunId, RunStamp, ServiceKind, TriggerKind, Triple,
};

// Re-export all traits at crate root.
pub use traits::{
    AccountDirectory, Collector, CredentialProvider, FreshnessLedger, InventoryStore,
    ReplaceOutcome, StorageAdapter,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cirrus_error_kinds() {
        let denied = CirrusError::AssumeRoleDenied {
            account_id: "222".into(),
            message: "not authorized".into(),
        };
        assert_eq!(denied.kind(), FailureKind::AssumeRoleDenied);
        assert_eq!(denied.kind().to_string(), "assume_role_denied");

        let pagination = CirrusError::CollectorPagination {
            service: ServiceKind::ComputeInstance,
            region: "us-east-1".into(),
            pages_fetched: 2,
            message: "InternalError".into(),
        };
        assert_eq!(pagination.kind(), FailureKind::CollectorPagination);
        assert!(pagination.to_string().contains("after 2 page(s)"));

        let storage = CirrusError::Storage {
            source: Box::new(std::io::Error::other("disk full")),
        };
        assert_eq!(storage.kind(), FailureKind::Storage);
    }

    #[test]
    fn aws_error_display_includes_code_when_present() {
        let with_code = CirrusError::Aws {
            code: Some("InternalFailure".into()),
            message: "boom".into(),
        };
        assert_eq!(with_code.to_string(), "aws error [InternalFailure]: boom");
        let without = CirrusError::Aws {
            code: None,
            message: "boom".into(),
        };
        assert_eq!(without.to_string(), "aws error: boom");
    }
}
