// SPDX-FileCopyrightText: 2026 Cirrus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Cirrus inventory engine.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;

use crate::types::ServiceKind;

/// The primary error type used across all Cirrus components.
#[derive(Debug, Error)]
pub enum CirrusError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The account list could not be produced. No partial list is ever used.
    #[error("account directory unavailable: {message}")]
    DirectoryUnavailable {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The target account refused the role assumption.
    #[error("assume role denied for account {account_id}: {message}")]
    AssumeRoleDenied { account_id: String, message: String },

    /// The well-known role does not exist in the target account.
    #[error("assume role not found in account {account_id}: {message}")]
    AssumeRoleNotFound { account_id: String, message: String },

    /// A listing failed part way through. Pages already fetched are discarded.
    #[error("{service} listing failed in {region} after {pages_fetched} page(s): {message}")]
    CollectorPagination {
        service: ServiceKind,
        region: String,
        pages_fetched: usize,
        message: String,
    },

    /// Rate limiting persisted through every retry attempt.
    #[error("throttled after {attempts} attempt(s): {message}")]
    ThrottleExceeded { attempts: u32, message: String },

    /// Any other AWS API failure that is not classified more precisely.
    #[error("aws error{}: {message}", code.as_deref().map(|c| format!(" [{c}]")).unwrap_or_default())]
    Aws {
        code: Option<String>,
        message: String,
    },

    /// A scheduled sweep exceeded its wall-clock ceiling.
    #[error("run exceeded wall-clock ceiling of {ceiling:?}")]
    RunTimeout { ceiling: std::time::Duration },

    /// An on-demand refresh overlapped a run that is already in flight.
    #[error("refresh rejected: {overlapping} triple(s) already in progress")]
    ScopeAlreadyInProgress { overlapping: usize },

    /// No collector is registered for the requested service.
    #[error("no collector registered for service {0}")]
    UnknownService(ServiceKind),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CirrusError {
    /// Classifies this error into the coarse kind recorded in run reports and metrics.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Config(_) | Self::Internal(_) | Self::UnknownService(_) => FailureKind::Internal,
            Self::Storage { .. } => FailureKind::Storage,
            Self::DirectoryUnavailable { .. } => FailureKind::DirectoryUnavailable,
            Self::AssumeRoleDenied { .. } => FailureKind::AssumeRoleDenied,
            Self::AssumeRoleNotFound { .. } => FailureKind::AssumeRoleNotFound,
            Self::CollectorPagination { .. } => FailureKind::CollectorPagination,
            Self::ThrottleExceeded { .. } => FailureKind::ThrottleExceeded,
            Self::Aws { .. } => FailureKind::Aws,
            Self::RunTimeout { .. } => FailureKind::RunTimeout,
            Self::ScopeAlreadyInProgress { .. } => FailureKind::ScopeAlreadyInProgress,
        }
    }
}

/// Coarse classification of a failure, stable enough for metrics labels.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    DirectoryUnavailable,
    AssumeRoleDenied,
    AssumeRoleNotFound,
    CollectorPagination,
    ThrottleExceeded,
    Aws,
    RunTimeout,
    ScopeAlreadyInProgress,
    Storage,
    Internal,
}
