// SPDX-FileCopyrightText: 2026 Cirrus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! STS-backed credential sources.

use async_trait::async_trait;
use aws_credential_types::provider::ProvideCredentials;
use chrono::{DateTime, Utc};
use cirrus_core::{Credential, CredentialOrigin};
use tracing::debug;

use crate::context::AwsContext;
use crate::error::{classify_sdk_error, AwsError};
use crate::time::to_chrono;

/// Everything needed for one `sts:AssumeRole` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssumeRoleRequest {
    pub account_id: String,
    pub role_arn: String,
    pub session_name: String,
    pub external_id: Option<String>,
    pub duration_secs: u32,
}

/// Where raw credentials come from. The broker layers caching and retries on top.
#[async_trait]
pub trait CredentialSource: Send + Sync + 'static {
    /// Assume the role named in `request`.
    async fn assume_role(&self, request: &AssumeRoleRequest) -> Result<Credential, AwsError>;

    /// The execution environment's own credential, attributed to `account_id`.
    async fn ambient(&self, account_id: &str) -> Result<Credential, AwsError>;
}

/// Real credential source using the ambient SDK configuration.
#[derive(Debug, Clone)]
pub struct StsCredentialSource {
    ctx: AwsContext,
}

impl StsCredentialSource {
    pub fn new(ctx: AwsContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl CredentialSource for StsCredentialSource {
    async fn assume_role(&self, request: &AssumeRoleRequest) -> Result<Credential, AwsError> {
        let response = self
            .ctx
            .sts_client()
            .assume_role()
            .role_arn(&request.role_arn)
            .role_session_name(&request.session_name)
            .set_external_id(request.external_id.clone())
            .duration_seconds(i32::try_from(request.duration_secs).unwrap_or(i32::MAX))
            .send()
            .await
            .map_err(|e| classify_sdk_error(&e))?;

        let creds = response.credentials().ok_or_else(|| AwsError::Sdk {
            code: None,
            message: "AssumeRole returned no credentials".into(),
        })?;

        debug!(
            account_id = %request.account_id,
            session = %request.session_name,
            "assumed role"
        );

        Ok(Credential::new(
            request.account_id.clone(),
            creds.access_key_id(),
            creds.secret_access_key(),
            Some(creds.session_token().to_string()),
            to_chrono(creds.expiration()),
            CredentialOrigin::AssumedRole,
        ))
    }

    async fn ambient(&self, account_id: &str) -> Result<Credential, AwsError> {
        let provider = self
            .ctx
            .sdk_config()
            .credentials_provider()
            .ok_or_else(|| AwsError::Sdk {
                code: None,
                message: "no ambient credentials provider configured".into(),
            })?;
        let creds = provider
            .provide_credentials()
            .await
            .map_err(|e| AwsError::Sdk {
                code: None,
                message: e.to_string(),
            })?;

        Ok(Credential::new(
            account_id,
            creds.access_key_id(),
            creds.secret_access_key(),
            creds.session_token().map(str::to_string),
            creds.expiry().map(DateTime::<Utc>::from),
            CredentialOrigin::Ambient,
        ))
    }
}

/// The account id behind the ambient credential, via `GetCallerIdentity`.
pub async fn caller_account_id(ctx: &AwsContext) -> Result<String, AwsError> {
    let identity = ctx
        .sts_client()
        .get_caller_identity()
        .send()
        .await
        .map_err(|e| classify_sdk_error(&e))?;
    identity
        .account()
        .map(str::to_string)
        .ok_or_else(|| AwsError::Sdk {
            code: None,
            message: "GetCallerIdentity returned no account".into(),
        })
}
