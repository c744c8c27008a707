// SPDX-FileCopyrightText: 2026 Cirrus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Daily sweep scheduling and retention for Cirrus.

pub mod retention;
pub mod scheduler;

pub use retention::purge_expired;
pub use scheduler::{SweepOutcome, SweepScheduler};
