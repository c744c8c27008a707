// SPDX-FileCopyrightText: 2026 Cirrus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared pagination and detail-call handling.
//!
//! Every page is fetched through the retry loop, so throttling is retried
//! with backoff and counted. A listing is all or nothing: if any page fails
//! after retries, the pages already fetched are discarded and the caller gets
//! an error, never a truncated list.

use std::future::Future;

use cirrus_aws::AwsError;
use cirrus_core::{CirrusError, ServiceKind};
use cirrus_resilience::{retry, RetryError};
use tracing::{debug, warn};

use crate::context::CollectorContext;

/// One page of a listing and the token for the next one.
#[derive(Debug)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next: Option<String>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, next: Option<&str>) -> Self {
        Self {
            items,
            next: next.filter(|t| !t.is_empty()).map(str::to_string),
        }
    }
}

/// Identifies a listing in logs and errors.
#[derive(Debug, Clone, Copy)]
pub struct Listing<'a> {
    pub service: ServiceKind,
    pub region: &'a str,
    pub operation: &'a str,
}

/// Follow continuation tokens until exhausted.
///
/// A region that is not enabled for the account (first page fails with
/// `OptInRequired`) yields an empty listing.
pub async fn collect_all<T, F, Fut>(
    ctx: &CollectorContext,
    listing: Listing<'_>,
    mut fetch: F,
) -> Result<Vec<T>, CirrusError>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>, AwsError>>,
{
    let mut items = Vec::new();
    let mut token: Option<String> = None;
    let mut pages = 0usize;

    loop {
        let current = token.clone();
        let page = match retry(&ctx.policy, ctx.sleeper.as_ref(), listing.operation, || {
            fetch(current.clone())
        })
        .await
        {
            Ok(page) => page,
            Err(RetryError::Permanent { error, .. })
                if pages == 0 && error.is_region_unavailable() =>
            {
                debug!(
                    service = %listing.service,
                    region = listing.region,
                    "region not enabled, treating as empty"
                );
                return Ok(Vec::new());
            }
            Err(err) => return Err(listing_error(listing, pages, err)),
        };

        pages += 1;
        items.extend(page.items);

        match page.next {
            Some(next) if token.as_deref() == Some(next.as_str()) => {
                return Err(CirrusError::CollectorPagination {
                    service: listing.service,
                    region: listing.region.to_string(),
                    pages_fetched: pages,
                    message: format!("{} returned a repeating continuation token", listing.operation),
                });
            }
            Some(next) => token = Some(next),
            None => break,
        }

        if pages >= ctx.max_pages {
            return Err(CirrusError::CollectorPagination {
                service: listing.service,
                region: listing.region.to_string(),
                pages_fetched: pages,
                message: format!("{} exceeded {} pages", listing.operation, ctx.max_pages),
            });
        }
    }

    debug!(
        service = %listing.service,
        region = listing.region,
        operation = listing.operation,
        pages,
        items = items.len(),
        "listing complete"
    );
    Ok(items)
}

fn listing_error(listing: Listing<'_>, pages: usize, err: RetryError<AwsError>) -> CirrusError {
    warn!(
        service = %listing.service,
        region = listing.region,
        operation = listing.operation,
        pages_fetched = pages,
        error = %err,
        "listing failed"
    );
    match err {
        RetryError::Exhausted {
            attempts,
            last: last @ AwsError::Throttled { .. },
        } => CirrusError::ThrottleExceeded {
            attempts,
            message: format!("{}: {}", listing.operation, last.message()),
        },
        err if pages == 0 => err.into_inner().into(),
        err => CirrusError::CollectorPagination {
            service: listing.service,
            region: listing.region.to_string(),
            pages_fetched: pages,
            message: err.to_string(),
        },
    }
}

/// One per-item describe call.
///
/// `NotFound` means the item vanished between list and describe and yields
/// `None`. Throttling is retried; other failures fail the triple.
pub async fn describe<T, F, Fut>(
    ctx: &CollectorContext,
    operation: &str,
    item: &str,
    fetch: F,
) -> Result<Option<T>, CirrusError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AwsError>>,
{
    match retry(&ctx.policy, ctx.sleeper.as_ref(), operation, fetch).await {
        Ok(value) => Ok(Some(value)),
        Err(RetryError::Permanent { error, .. }) if error.is_not_found() => {
            debug!(operation, item, "item vanished before describe, skipping");
            Ok(None)
        }
        Err(RetryError::Exhausted {
            attempts,
            last: last @ AwsError::Throttled { .. },
        }) => Err(CirrusError::ThrottleExceeded {
            attempts,
            message: format!("{operation} {item}: {}", last.message()),
        }),
        Err(err) => Err(err.into_inner().into()),
    }
}

/// A best-effort detail lookup: any failure falls back to `None`.
pub async fn best_effort<T, Fut>(operation: &str, item: &str, fut: Fut) -> Option<T>
where
    Fut: Future<Output = Result<T, AwsError>>,
{
    match fut.await {
        Ok(value) => Some(value),
        Err(err) => {
            debug!(operation, item, error = %err, "detail unavailable, using default");
            None
        }
    }
}
