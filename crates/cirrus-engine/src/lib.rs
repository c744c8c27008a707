// SPDX-FileCopyrightText: 2026 Cirrus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collection engine for Cirrus.
//!
//! The [`Orchestrator`] expands a scope into (service, account, region)
//! triples and runs them on a bounded worker pool. The [`RefreshTrigger`]
//! starts scheduled sweeps and on-demand refreshes, and the
//! [`InventoryApi`] serves reads from the store without touching AWS.

pub mod api;
pub mod export;
pub mod inflight;
pub mod orchestrator;
pub mod planner;
pub mod recording;
pub mod report;
pub mod summary;
pub mod trigger;

pub use api::InventoryApi;
pub use export::ExportFormat;
pub use inflight::{InFlightRegistry, TripleClaim};
pub use orchestrator::{Orchestrator, OrchestratorSettings, RUN_TIMEOUT_MESSAGE, RunOptions};
pub use planner::expand_scope;
pub use report::{CollectionReport, RunAbort, SkipReason, SkippedTriple, TripleFailure};
pub use summary::InventorySummary;
pub use trigger::{RefreshAcceptance, RefreshToken, RefreshTrigger, SweepSettings};
