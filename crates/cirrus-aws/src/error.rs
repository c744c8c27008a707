// SPDX-FileCopyrightText: 2026 Cirrus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! AWS error classification.
//!
//! SDK failures are classified by their error code (via
//! `ProvideErrorMetadata::code`), never by matching on `Debug` output.

use std::error::Error as StdError;

use aws_smithy_runtime_api::client::result::SdkError;
use aws_smithy_types::error::display::DisplayErrorContext;
use aws_smithy_types::error::metadata::ProvideErrorMetadata;
use cirrus_core::CirrusError;
use cirrus_resilience::Retryable;
use thiserror::Error;

/// Coarse AWS failure categories that drive retry and mapping decisions.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AwsError {
    /// Rate limit exceeded. Retried with backoff.
    #[error("throttled [{code}]: {message}")]
    Throttled { code: String, message: String },

    /// The request never got an answer (timeout or connection failure). Retried.
    #[error("transient failure: {message}")]
    Transient { message: String },

    /// The caller is not permitted to perform the operation.
    #[error("access denied [{code}]: {message}")]
    AccessDenied { code: String, message: String },

    /// The addressed entity does not exist (or vanished between list and describe).
    #[error("not found [{code}]: {message}")]
    NotFound { code: String, message: String },

    /// The region is not enabled for the account.
    #[error("region unavailable: {message}")]
    RegionUnavailable { message: String },

    /// The account is not part of an organization, or cannot read it.
    #[error("organizations unavailable: {message}")]
    OrganizationsUnavailable { message: String },

    /// Anything else, carried with its code.
    #[error("aws error{}: {message}", code.as_deref().map(|c| format!(" [{c}]")).unwrap_or_default())]
    Sdk {
        code: Option<String>,
        message: String,
    },
}

const THROTTLING_CODES: &[&str] = &[
    "Throttling",
    "ThrottlingException",
    "ThrottledException",
    "RequestLimitExceeded",
    "RequestThrottled",
    "RequestThrottledException",
    "TooManyRequestsException",
    "ProvisionedThroughputExceededException",
    "SlowDown",
    "PriorRequestNotComplete",
];

const ACCESS_DENIED_CODES: &[&str] = &[
    "AccessDenied",
    "AccessDeniedException",
    "UnauthorizedOperation",
    "AuthorizationError",
    "InvalidClientTokenId",
];

const NOT_FOUND_CODES: &[&str] = &[
    "NoSuchEntity",
    "NoSuchBucket",
    "ResourceNotFoundException",
    "ClusterNotFoundException",
    "DBInstanceNotFound",
    "NotFoundException",
];

const REGION_UNAVAILABLE_CODES: &[&str] = &["OptInRequired"];

const ORGANIZATIONS_UNAVAILABLE_CODES: &[&str] = &[
    "AWSOrganizationsNotInUseException",
    "AccessDeniedForDependencyException",
];

/// Classify an error from its code and message.
pub fn classify_aws_error(code: Option<&str>, message: Option<&str>) -> AwsError {
    let message = message.unwrap_or("unknown error").to_string();
    let owned = |c: &str| c.to_string();

    match code {
        Some(c) if THROTTLING_CODES.contains(&c) => AwsError::Throttled {
            code: owned(c),
            message,
        },
        Some(c) if ACCESS_DENIED_CODES.contains(&c) => AwsError::AccessDenied {
            code: owned(c),
            message,
        },
        Some(c) if NOT_FOUND_CODES.contains(&c) || c.ends_with(".NotFound") => {
            AwsError::NotFound {
                code: owned(c),
                message,
            }
        }
        Some(c) if REGION_UNAVAILABLE_CODES.contains(&c) => AwsError::RegionUnavailable { message },
        Some(c) if ORGANIZATIONS_UNAVAILABLE_CODES.contains(&c) => {
            AwsError::OrganizationsUnavailable { message }
        }
        _ => AwsError::Sdk {
            code: code.map(str::to_string),
            message,
        },
    }
}

/// Classify a failed SDK call of any service.
///
/// Timeouts and dispatch failures carry no service code and are reported as
/// [`AwsError::Transient`].
pub fn classify_sdk_error<E, R>(err: &SdkError<E, R>) -> AwsError
where
    E: ProvideErrorMetadata + StdError + 'static,
    R: std::fmt::Debug,
{
    match err {
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) => AwsError::Transient {
            message: DisplayErrorContext(err).to_string(),
        },
        _ => {
            let fallback = DisplayErrorContext(err).to_string();
            classify_aws_error(err.code(), Some(err.message().unwrap_or(fallback.as_str())))
        }
    }
}

impl AwsError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_region_unavailable(&self) -> bool {
        matches!(self, Self::RegionUnavailable { .. })
    }

    /// The AWS error code, when one was reported.
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Throttled { code, .. }
            | Self::AccessDenied { code, .. }
            | Self::NotFound { code, .. } => Some(code),
            Self::Sdk { code, .. } => code.as_deref(),
            Self::Transient { .. }
            | Self::RegionUnavailable { .. }
            | Self::OrganizationsUnavailable { .. } => None,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Throttled { message, .. }
            | Self::Transient { message }
            | Self::AccessDenied { message, .. }
            | Self::NotFound { message, .. }
            | Self::RegionUnavailable { message }
            | Self::OrganizationsUnavailable { message }
            | Self::Sdk { message, .. } => message,
        }
    }
}

impl Retryable for AwsError {
    fn is_retryable(&self) -> bool {
        matches!(self, Self::Throttled { .. } | Self::Transient { .. })
    }
}

impl From<AwsError> for CirrusError {
    fn from(err: AwsError) -> Self {
        CirrusError::Aws {
            code: err.code().map(str::to_string),
            message: err.message().to_string(),
        }
    }
}
