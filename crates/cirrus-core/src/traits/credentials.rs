// SPDX-FileCopyrightText: 2026 Cirrus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Credential provider trait.

use std::sync::Arc;

use async_trait::async_trait;

use crate::credential::Credential;
use crate::error::CirrusError;
use crate::types::RunId;

/// Hands out read-only credentials for target accounts.
#[async_trait]
pub trait CredentialProvider: Send + Sync + 'static {
    /// Returns a credential for `account_id`.
    ///
    /// `is_local` selects the ambient execution credential instead of role
    /// assumption. `run_id` names the session for audit trails.
    /// Fails with `AssumeRoleDenied` or `AssumeRoleNotFound`.
    async fn credential(
        &self,
        account_id: &str,
        is_local: bool,
        run_id: &RunId,
    ) -> Result<Arc<Credential>, CirrusError>;
}
