// SPDX-FileCopyrightText: 2026 Cirrus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cron-driven sweep loop.
//!
//! The scheduler sleeps until the next cron occurrence (UTC), runs one
//! scheduled sweep to completion or ceiling, then optionally purges expired
//! records. Sweeps never overlap: the next occurrence is computed only after
//! the previous sweep returns.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use cirrus_config::ScheduleConfig;
use cirrus_core::{CirrusError, InventoryStore};
use cirrus_engine::{CollectionReport, RefreshTrigger};
use croner::Cron;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::retention;

/// What one scheduled tick did.
#[derive(Debug, Clone)]
pub struct SweepOutcome {
    pub report: CollectionReport,
    /// `None` when purging is disabled or the purge failed.
    pub purged: Option<usize>,
}

pub struct SweepScheduler {
    schedule: Cron,
    expression: String,
    trigger: Arc<RefreshTrigger>,
    store: Arc<dyn InventoryStore>,
    purge_after_sweep: bool,
}

impl SweepScheduler {
    pub fn new(
        config: &ScheduleConfig,
        trigger: Arc<RefreshTrigger>,
        store: Arc<dyn InventoryStore>,
    ) -> Result<Self, CirrusError> {
        let schedule = config.cron.parse::<Cron>().map_err(|e| {
            CirrusError::Config(format!("invalid schedule.cron `{}`: {e}", config.cron))
        })?;
        Ok(Self {
            schedule,
            expression: config.cron.clone(),
            trigger,
            store,
            purge_after_sweep: config.purge_after_sweep,
        })
    }

    /// The first occurrence strictly after `after`.
    pub fn next_fire(&self, after: DateTime<Utc>) -> Result<DateTime<Utc>, CirrusError> {
        self.schedule
            .find_next_occurrence(&after, false)
            .map_err(|e| {
                CirrusError::Config(format!(
                    "schedule `{}` has no occurrence after {after}: {e}",
                    self.expression
                ))
            })
    }

    /// One sweep plus the optional retention purge.
    pub async fn run_once(&self) -> SweepOutcome {
        self.run_once_until(CancellationToken::new()).await
    }

    /// [`Self::run_once`], with queued triples cancelled once `shutdown` fires.
    pub async fn run_once_until(&self, shutdown: CancellationToken) -> SweepOutcome {
        let report = self.trigger.on_schedule_until(shutdown).await;
        let purged = if self.purge_after_sweep {
            match retention::purge_expired(self.store.as_ref(), Utc::now()).await {
                Ok(removed) => Some(removed),
                Err(e) => {
                    error!(error = %e, "retention purge failed");
                    None
                }
            }
        } else {
            None
        };
        SweepOutcome { report, purged }
    }

    /// Runs until `cancel` fires. A sweep in progress when cancellation
    /// arrives stops starting triples; those already running finish on their own.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), CirrusError> {
        info!(schedule = %self.expression, "sweep scheduler started");
        loop {
            let now = Utc::now();
            let next = self.next_fire(now)?;
            let wait = (next - now).to_std().unwrap_or_default();
            info!(next_run = %next, "next scheduled sweep");

            tokio::select! {
                () = tokio::time::sleep(wait) => {}
                () = cancel.cancelled() => break,
            }

            tokio::select! {
                outcome = self.run_once_until(cancel.clone()) => log_outcome(&outcome),
                () = cancel.cancelled() => {
                    warn!("shutdown requested during sweep, abandoning it");
                    break;
                }
            }
        }
        info!("sweep scheduler stopped");
        Ok(())
    }
}

fn log_outcome(outcome: &SweepOutcome) {
    let report = &outcome.report;
    if let Some(abort) = &report.aborted {
        error!(
            run_id = %report.run_id,
            kind = %abort.kind,
            error = %abort.message,
            "scheduled sweep aborted"
        );
        return;
    }
    info!(
        run_id = %report.run_id,
        succeeded = report.succeeded,
        failed = report.failed,
        skipped = report.skipped.len(),
        timed_out = report.timed_out().count(),
        purged = outcome.purged.unwrap_or(0),
        elapsed_ms = report.duration().num_milliseconds(),
        "scheduled sweep complete"
    );
}
