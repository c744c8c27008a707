// SPDX-FileCopyrightText: 2026 Cirrus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock account directory and credential provider.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use cirrus_core::{
    AccountDirectory, AccountInfo, CirrusError, Credential, CredentialOrigin, CredentialProvider,
    RunId,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// A directory returning a fixed account list, or failing on demand.
pub struct MockDirectory {
    accounts: Mutex<Result<Vec<AccountInfo>, String>>,
    calls: AtomicUsize,
}

impl MockDirectory {
    pub fn new(accounts: Vec<AccountInfo>) -> Self {
        Self {
            accounts: Mutex::new(Ok(accounts)),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set_accounts(&self, accounts: Vec<AccountInfo>) {
        *lock(&self.accounts) = Ok(accounts);
    }

    /// Subsequent listings fail with `DirectoryUnavailable`.
    pub fn set_unavailable(&self, message: &str) {
        *lock(&self.accounts) = Err(message.to_string());
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AccountDirectory for MockDirectory {
    fn name(&self) -> &str {
        "mock"
    }

    async fn list_accounts(&self) -> Result<Vec<AccountInfo>, CirrusError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.accounts)
            .clone()
            .map_err(|message| CirrusError::DirectoryUnavailable {
                message,
                source: None,
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Refusal {
    Denied,
    NotFound,
}

/// Hands out fake credentials and can refuse specific accounts.
#[derive(Default)]
pub struct MockCredentials {
    refusals: Mutex<HashMap<String, Refusal>>,
    calls: Mutex<Vec<(String, bool)>>,
}

impl MockCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    /// Role assumption into `account` fails with `AssumeRoleDenied`.
    pub fn deny(&self, account: &str) {
        lock(&self.refusals).insert(account.to_string(), Refusal::Denied);
    }

    /// Role assumption into `account` fails with `AssumeRoleNotFound`.
    pub fn missing_role(&self, account: &str) {
        lock(&self.refusals).insert(account.to_string(), Refusal::NotFound);
    }

    pub fn allow(&self, account: &str) {
        lock(&self.refusals).remove(account);
    }

    /// Every request as (account, is_local).
    pub fn calls(&self) -> Vec<(String, bool)> {
        lock(&self.calls).clone()
    }
}

#[async_trait]
impl CredentialProvider for MockCredentials {
    async fn credential(
        &self,
        account_id: &str,
        is_local: bool,
        _run_id: &RunId,
    ) -> Result<Arc<Credential>, CirrusError> {
        lock(&self.calls).push((account_id.to_string(), is_local));
        let refusal = lock(&self.refusals).get(account_id).copied();
        match refusal {
            Some(Refusal::Denied) => Err(CirrusError::AssumeRoleDenied {
                account_id: account_id.to_string(),
                message: "not authorized to perform sts:AssumeRole".into(),
            }),
            Some(Refusal::NotFound) => Err(CirrusError::AssumeRoleNotFound {
                account_id: account_id.to_string(),
                message: "role does not exist".into(),
            }),
            None => {
                let origin = if is_local {
                    CredentialOrigin::Ambient
                } else {
                    CredentialOrigin::AssumedRole
                };
                Ok(Arc::new(Credential::new(
                    account_id,
                    "AKIDMOCK",
                    "mock-secret",
                    Some("mock-token".into()),
                    None,
                    origin,
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn directory_switches_to_unavailable() {
        let directory = MockDirectory::new(vec![AccountInfo::new("A", "alpha")]);
        assert_eq!(directory.list_accounts().await.unwrap().len(), 1);
        directory.set_unavailable("not in organization");
        assert!(matches!(
            directory.list_accounts().await,
            Err(CirrusError::DirectoryUnavailable { .. })
        ));
        assert_eq!(directory.call_count(), 2);
    }

    #[tokio::test]
    async fn credentials_refuse_configured_accounts() {
        let credentials = MockCredentials::new();
        credentials.deny("B");
        credentials.missing_role("C");
        let run = RunId("r".into());
        assert!(credentials.credential("A", false, &run).await.is_ok());
        assert!(matches!(
            credentials.credential("B", false, &run).await,
            Err(CirrusError::AssumeRoleDenied { .. })
        ));
        assert!(matches!(
            credentials.credential("C", false, &run).await,
            Err(CirrusError::AssumeRoleNotFound { .. })
        ));
        assert_eq!(credentials.calls().len(), 3);
    }
}
