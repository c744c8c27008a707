// SPDX-FileCopyrightText: 2026 Cirrus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Retention purge of expired inventory records.

use chrono::{DateTime, Utc};
use cirrus_core::{CirrusError, InventoryStore};
use tracing::info;

/// Deletes every record whose `expiresAt` is at or before `now`.
///
/// Returns the number of records removed.
pub async fn purge_expired(
    store: &dyn InventoryStore,
    now: DateTime<Utc>,
) -> Result<usize, CirrusError> {
    let removed = store.purge_expired(now).await?;
    if removed > 0 {
        info!(removed, cutoff = %now, "expired inventory records purged");
    }
    Ok(removed)
}
