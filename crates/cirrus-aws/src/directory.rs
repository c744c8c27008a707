// SPDX-FileCopyrightText: 2026 Cirrus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Account directory strategies.
//!
//! A directory either returns the complete account list or fails with
//! `DirectoryUnavailable`; a partial list is never returned.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use aws_sdk_organizations::types::AccountStatus;
use cirrus_config::{AccountSource, AccountsConfig};
use cirrus_core::{AccountDirectory, AccountInfo, CirrusError};
use cirrus_resilience::{retry, RetryPolicy, Sleeper, TokioSleeper};
use tracing::{info, warn};

use crate::context::AwsContext;
use crate::error::{classify_sdk_error, AwsError};
use crate::sts::caller_account_id;

/// Name given to the ambient account by the local strategy.
const LOCAL_ACCOUNT_NAME: &str = "Current Account";

fn unavailable(err: AwsError) -> CirrusError {
    CirrusError::DirectoryUnavailable {
        message: err.to_string(),
        source: Some(Box::new(err)),
    }
}

/// Every ACTIVE member account of the organization.
pub struct OrganizationDirectory {
    client: aws_sdk_organizations::Client,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl OrganizationDirectory {
    pub fn new(ctx: &AwsContext, policy: RetryPolicy) -> Self {
        Self {
            client: ctx.organizations_client(),
            policy,
            sleeper: Arc::new(TokioSleeper),
        }
    }
}

#[async_trait]
impl AccountDirectory for OrganizationDirectory {
    fn name(&self) -> &str {
        "organization"
    }

    async fn list_accounts(&self) -> Result<Vec<AccountInfo>, CirrusError> {
        let mut accounts = Vec::new();
        let mut next_token: Option<String> = None;
        loop {
            let token = next_token.clone();
            let page = retry(&self.policy, self.sleeper.as_ref(), "organizations:ListAccounts", || {
                let token = token.clone();
                async move {
                    self.client
                        .list_accounts()
                        .set_next_token(token)
                        .send()
                        .await
                        .map_err(|e| classify_sdk_error(&e))
                }
            })
            .await
            .map_err(|e| unavailable(e.into_inner()))?;

            for account in page.accounts() {
                if account.status() != Some(&AccountStatus::Active) {
                    continue;
                }
                if let Some(id) = account.id() {
                    let name = account.name().unwrap_or(id);
                    accounts.push(AccountInfo::new(id, name));
                }
            }

            next_token = page.next_token().map(str::to_string);
            if next_token.is_none() {
                break;
            }
        }

        info!(count = accounts.len(), "listed organization accounts");
        Ok(accounts)
    }
}

/// A fixed list from configuration, in `id:name,id:name` form.
#[derive(Debug, Clone)]
pub struct StaticDirectory {
    accounts: Vec<AccountInfo>,
}

impl StaticDirectory {
    pub fn new(accounts: Vec<AccountInfo>) -> Self {
        Self { accounts }
    }

    /// Parse `id[:name]` entries separated by commas.
    ///
    /// An entry without a name is called `Account {id}`. Entries with an empty
    /// id are skipped, and a repeated id keeps its first entry.
    pub fn parse(raw: &str) -> Self {
        let mut seen = HashSet::new();
        let mut accounts = Vec::new();
        for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (id, name) = match entry.split_once(':') {
                Some((id, name)) => (id.trim(), name.trim()),
                None => (entry, ""),
            };
            if id.is_empty() {
                warn!(entry, "skipping static account entry without an id");
                continue;
            }
            if !seen.insert(id.to_string()) {
                warn!(account_id = id, "duplicate static account entry ignored");
                continue;
            }
            let name = if name.is_empty() {
                format!("Account {id}")
            } else {
                name.to_string()
            };
            accounts.push(AccountInfo::new(id, name));
        }
        Self { accounts }
    }
}

#[async_trait]
impl AccountDirectory for StaticDirectory {
    fn name(&self) -> &str {
        "static"
    }

    async fn list_accounts(&self) -> Result<Vec<AccountInfo>, CirrusError> {
        if self.accounts.is_empty() {
            return Err(CirrusError::DirectoryUnavailable {
                message: "static account list is empty".into(),
                source: None,
            });
        }
        Ok(self.accounts.clone())
    }
}

/// Only the account the ambient credential belongs to.
pub struct LocalDirectory {
    ctx: AwsContext,
}

impl LocalDirectory {
    pub fn new(ctx: AwsContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl AccountDirectory for LocalDirectory {
    fn name(&self) -> &str {
        "local"
    }

    async fn list_accounts(&self) -> Result<Vec<AccountInfo>, CirrusError> {
        let account_id = caller_account_id(&self.ctx).await.map_err(unavailable)?;
        Ok(vec![AccountInfo::new(account_id, LOCAL_ACCOUNT_NAME)])
    }
}

/// Build the directory strategy selected by configuration.
pub fn directory_from_config(
    config: &AccountsConfig,
    ctx: &AwsContext,
    policy: RetryPolicy,
) -> Arc<dyn AccountDirectory> {
    match config.source {
        AccountSource::Organization => Arc::new(OrganizationDirectory::new(ctx, policy)),
        AccountSource::Static => Arc::new(StaticDirectory::parse(
            config.static_accounts.as_deref().unwrap_or_default(),
        )),
        AccountSource::Local => Arc::new(LocalDirectory::new(ctx.clone())),
    }
}
