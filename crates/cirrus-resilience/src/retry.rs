// SPDX-FileCopyrightText: 2026 Cirrus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Explicit retry loop with attempt counting.

use std::fmt;
use std::future::Future;

use tracing::{debug, warn};

use crate::policy::RetryPolicy;
use crate::sleeper::Sleeper;

/// Decides whether an error is worth another attempt.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

/// Why the loop gave up.
#[derive(Debug)]
pub enum RetryError<E> {
    /// Every attempt failed with a retryable error.
    Exhausted { attempts: u32, last: E },
    /// A non-retryable error ended the loop early.
    Permanent { attempt: u32, error: E },
}

impl<E> RetryError<E> {
    pub fn into_inner(self) -> E {
        match self {
            Self::Exhausted { last, .. } => last,
            Self::Permanent { error, .. } => error,
        }
    }

    /// The error that ended the loop.
    pub fn last(&self) -> &E {
        match self {
            Self::Exhausted { last, .. } => last,
            Self::Permanent { error, .. } => error,
        }
    }

    pub fn attempts(&self) -> u32 {
        match self {
            Self::Exhausted { attempts, .. } => *attempts,
            Self::Permanent { attempt, .. } => *attempt,
        }
    }
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exhausted { attempts, last } => {
                write!(f, "gave up after {attempts} attempt(s): {last}")
            }
            Self::Permanent { error, .. } => write!(f, "{error}"),
        }
    }
}

/// Runs `op` until it succeeds, fails permanently, or attempts run out.
///
/// Sleeps `policy.delay(n)` through `sleeper` before retry `n`.
pub async fn retry<T, E, F, Fut>(
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    operation: &str,
    mut op: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + fmt::Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;
    loop {
        attempt += 1;
        let error = match op().await {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };

        if !error.is_retryable() {
            return Err(RetryError::Permanent { attempt, error });
        }
        if attempt >= max_attempts {
            warn!(operation, attempts = attempt, error = %error, "retries exhausted");
            return Err(RetryError::Exhausted {
                attempts: attempt,
                last: error,
            });
        }

        let delay = policy.delay(attempt);
        debug!(
            operation,
            attempt,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            error = %error,
            "retrying after backoff"
        );
        sleeper.sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sleeper::RecordingSleeper;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    #[derive(Debug, PartialEq)]
    enum FakeError {
        Throttled,
        Broken,
    }

    impl fmt::Display for FakeError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{self:?}")
        }
    }

    impl Retryable for FakeError {
        fn is_retryable(&self) -> bool {
            matches!(self, FakeError::Throttled)
        }
    }

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(50),
            jitter: false,
        }
    }

    #[tokio::test]
    async fn succeeds_after_transient_throttling() {
        let sleeper = RecordingSleeper::new();
        let calls = AtomicU32::new(0);

        let result = retry(&policy(), &sleeper, "list", || async {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(FakeError::Throttled)
            } else {
                Ok("page")
            }
        })
        .await;

        assert_eq!(result.unwrap(), "page");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(
            sleeper.recorded(),
            vec![Duration::from_millis(10), Duration::from_millis(20)]
        );
    }

    #[tokio::test]
    async fn exhausts_after_max_attempts() {
        let sleeper = RecordingSleeper::new();
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = retry(&policy(), &sleeper, "list", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(FakeError::Throttled)
        })
        .await;

        match result {
            Err(RetryError::Exhausted { attempts, last }) => {
                assert_eq!(attempts, 5);
                assert_eq!(last, FakeError::Throttled);
            }
            other => panic!("expected exhaustion, got {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 5);
        // Four sleeps between five attempts, capped at max_delay.
        assert_eq!(
            sleeper.recorded(),
            vec![10, 20, 40, 50]
                .into_iter()
                .map(Duration::from_millis)
                .collect::<Vec<_>>()
        );
    }

    #[tokio::test]
    async fn permanent_errors_are_not_retried() {
        let sleeper = RecordingSleeper::new();
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = retry(&policy(), &sleeper, "list", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(FakeError::Broken)
        })
        .await;

        let err = result.unwrap_err();
        assert_eq!(err.attempts(), 1);
        assert_eq!(err.into_inner(), FakeError::Broken);
        assert!(sleeper.recorded().is_empty());
    }

    #[tokio::test]
    async fn single_attempt_policy_never_sleeps() {
        let sleeper = RecordingSleeper::new();
        let result: Result<(), _> =
            retry(&RetryPolicy::no_retry(), &sleeper, "list", || async {
                Err(FakeError::Throttled)
            })
            .await;
        assert!(matches!(result, Err(RetryError::Exhausted { attempts: 1, .. })));
        assert!(sleeper.recorded().is_empty());
    }
}
