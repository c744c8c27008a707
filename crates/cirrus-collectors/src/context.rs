// SPDX-FileCopyrightText: 2026 Cirrus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! What every collector needs besides its credential.

use std::sync::Arc;

use aws_config::SdkConfig;
use cirrus_aws::AwsContext;
use cirrus_core::Credential;
use cirrus_resilience::{RetryPolicy, Sleeper, TokioSleeper};

/// Upper bound on pages fetched for one listing before it is treated as runaway.
pub const DEFAULT_MAX_PAGES: usize = 10_000;

#[derive(Clone)]
pub struct CollectorContext {
    pub aws: AwsContext,
    pub policy: RetryPolicy,
    pub sleeper: Arc<dyn Sleeper>,
    pub max_pages: usize,
}

impl CollectorContext {
    pub fn new(aws: AwsContext, policy: RetryPolicy) -> Self {
        Self {
            aws,
            policy,
            sleeper: Arc::new(TokioSleeper),
            max_pages: DEFAULT_MAX_PAGES,
        }
    }

    /// SDK configuration signing with `credential` in `region`.
    pub fn sdk_config(&self, credential: &Credential, region: &str) -> SdkConfig {
        self.aws.scoped(credential, region)
    }
}
