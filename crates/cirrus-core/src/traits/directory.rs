// SPDX-FileCopyrightText: 2026 Cirrus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Account directory trait.

use async_trait::async_trait;

use crate::error::CirrusError;
use crate::types::AccountInfo;

/// Produces the list of accounts to scan.
///
/// Implementations do not cache; callers decide caching policy.
#[async_trait]
pub trait AccountDirectory: Send + Sync + 'static {
    /// Human-readable name of the strategy, used in logs.
    fn name(&self) -> &str;

    /// Lists target accounts. Fails with `DirectoryUnavailable` when the
    /// membership source cannot be read.
    async fn list_accounts(&self) -> Result<Vec<AccountInfo>, CirrusError>;
}
