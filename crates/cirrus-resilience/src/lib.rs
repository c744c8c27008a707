// SPDX-FileCopyrightText: 2026 Cirrus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Resilience primitives for AWS calls.
//!
//! - [`RetryPolicy`]: first-class backoff configuration (attempts, delays, jitter).
//! - [`retry`]: an explicit attempt loop that retries only what [`Retryable`] allows.
//! - [`Sleeper`]: the injected sleep used between attempts, so the loop can be
//!   tested without real time passing.

pub mod policy;
pub mod retry;
pub mod sleeper;

pub use policy::RetryPolicy;
pub use retry::{retry, RetryError, Retryable};
pub use sleeper::{RecordingSleeper, Sleeper, TokioSleeper};
