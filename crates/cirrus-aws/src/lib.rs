// SPDX-FileCopyrightText: 2026 Cirrus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! AWS plumbing for the Cirrus inventory engine.
//!
//! - [`AwsContext`]: ambient SDK configuration and per-credential derivation.
//! - [`CredentialBroker`]: cached, single-flight cross-account credentials.
//! - Account directories: organization, static list, or the local account.
//! - [`AwsError`]: code-based classification of SDK failures.

pub mod broker;
pub mod context;
pub mod directory;
pub mod error;
pub mod sts;
pub mod time;

pub use broker::{BrokerSettings, CredentialBroker};
pub use context::AwsContext;
pub use directory::{
    directory_from_config, LocalDirectory, OrganizationDirectory, StaticDirectory,
};
pub use error::{classify_aws_error, classify_sdk_error, AwsError};
pub use sts::{caller_account_id, AssumeRoleRequest, CredentialSource, StsCredentialSource};
