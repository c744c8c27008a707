// SPDX-FileCopyrightText: 2026 Cirrus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Entry points that start runs: the daily sweep and on-demand refreshes.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use cirrus_config::ScheduleConfig;
use cirrus_core::{CirrusError, CollectionScope, RunId, ServiceKind, now_millis};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::orchestrator::{Orchestrator, RunOptions};
use crate::report::CollectionReport;

/// Finished on-demand reports are kept for [`RefreshTrigger::wait`] until
/// this many runs are tracked; the oldest finished one is evicted first.
const MAX_TRACKED_RUNS: usize = 64;

#[derive(Debug, Clone)]
pub struct SweepSettings {
    /// Wall-clock ceiling for a scheduled sweep.
    pub ceiling: Duration,
    pub skip_fresh_within: Option<chrono::Duration>,
}

impl SweepSettings {
    pub fn from_config(config: &ScheduleConfig) -> Self {
        let skip = config.skip_fresh_within_minutes;
        Self {
            ceiling: Duration::from_secs(config.max_run_minutes.saturating_mul(60)),
            skip_fresh_within: i64::try_from(skip)
                .ok()
                .filter(|m| *m > 0)
                .and_then(chrono::Duration::try_minutes),
        }
    }
}

/// Handle to an accepted on-demand run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshToken {
    pub run_id: RunId,
    pub triples: usize,
}

/// Answer to an on-demand request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum RefreshAcceptance {
    Accepted(RefreshToken),
    /// Part of the requested scope is already being collected. Nothing was started.
    AlreadyInProgress { overlapping: usize },
}

impl RefreshAcceptance {
    /// The token, or `ScopeAlreadyInProgress`.
    pub fn into_result(self) -> Result<RefreshToken, CirrusError> {
        match self {
            Self::Accepted(token) => Ok(token),
            Self::AlreadyInProgress { overlapping } => {
                Err(CirrusError::ScopeAlreadyInProgress { overlapping })
            }
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted(_))
    }
}

type RunSlot = watch::Receiver<Option<CollectionReport>>;

/// On-demand runs awaiting [`RefreshTrigger::wait`], in acceptance order.
struct TrackedRuns {
    capacity: usize,
    order: VecDeque<RunId>,
    slots: HashMap<RunId, RunSlot>,
}

impl TrackedRuns {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            order: VecDeque::new(),
            slots: HashMap::new(),
        }
    }

    /// Tracks a new run. At capacity, the oldest finished runs are dropped;
    /// runs still executing are never dropped.
    fn insert(&mut self, run_id: RunId, slot: RunSlot) {
        while self.slots.len() >= self.capacity {
            let oldest_finished = self
                .order
                .iter()
                .position(|id| self.slots.get(id).is_some_and(|s| s.borrow().is_some()));
            let Some(index) = oldest_finished else { break };
            if let Some(evicted) = self.order.remove(index) {
                self.slots.remove(&evicted);
            }
        }
        self.order.push_back(run_id.clone());
        self.slots.insert(run_id, slot);
    }

    fn get(&self, run_id: &RunId) -> Option<RunSlot> {
        self.slots.get(run_id).cloned()
    }

    fn remove(&mut self, run_id: &RunId) {
        if self.slots.remove(run_id).is_some() {
            self.order.retain(|id| id != run_id);
        }
    }
}

pub struct RefreshTrigger {
    orchestrator: Orchestrator,
    sweep: SweepSettings,
    runs: Arc<Mutex<TrackedRuns>>,
}

impl RefreshTrigger {
    pub fn new(orchestrator: Orchestrator, sweep: SweepSettings) -> Self {
        Self {
            orchestrator,
            sweep,
            runs: Arc::new(Mutex::new(TrackedRuns::new(MAX_TRACKED_RUNS))),
        }
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    fn runs(&self) -> MutexGuard<'_, TrackedRuns> {
        self.runs.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// The daily sweep: every service, account and supported region, bounded
    /// by the wall-clock ceiling. Returns when the run is complete or abandoned.
    pub async fn on_schedule(&self) -> CollectionReport {
        self.on_schedule_until(CancellationToken::new()).await
    }

    /// [`Self::on_schedule`], stopping early when `shutdown` is cancelled.
    /// Queued triples are not started; running ones finish on their own.
    pub async fn on_schedule_until(&self, shutdown: CancellationToken) -> CollectionReport {
        let options = RunOptions::scheduled(self.sweep.ceiling, self.sweep.skip_fresh_within)
            .with_shutdown(shutdown);
        info!(run_id = %options.run_id, "scheduled sweep starting");
        self.orchestrator
            .run(&CollectionScope::full(), options)
            .await
    }

    /// Starts an on-demand run in the background.
    ///
    /// The whole scope is claimed atomically: if any of its triples is in
    /// flight, nothing starts and `AlreadyInProgress` is returned. Fails only
    /// when the account directory is unavailable.
    pub async fn on_demand(
        &self,
        service: Option<ServiceKind>,
        account_ids: Option<Vec<String>>,
    ) -> Result<RefreshAcceptance, CirrusError> {
        let scope = CollectionScope::on_demand(service, account_ids);
        let triples = self.orchestrator.plan(&scope).await?;

        let claims = match self.orchestrator.inflight().try_claim_all(&triples) {
            Ok(claims) => claims,
            Err(overlapping) => {
                warn!(overlapping, requested = triples.len(), "on-demand refresh rejected, scope already in progress");
                return Ok(RefreshAcceptance::AlreadyInProgress { overlapping });
            }
        };

        let options = RunOptions::on_demand();
        let token = RefreshToken {
            run_id: options.run_id.clone(),
            triples: claims.len(),
        };
        let (tx, rx) = watch::channel(None);
        self.runs().insert(options.run_id.clone(), rx);

        info!(run_id = %token.run_id, triples = token.triples, ?service, "on-demand refresh accepted");
        let orchestrator = self.orchestrator.clone();
        tokio::spawn(async move {
            let report = CollectionReport::begin(options.run_id.clone(), options.trigger, now_millis());
            let report = orchestrator.execute(claims, &options, report).await;
            let _ = tx.send(Some(report));
        });
        Ok(RefreshAcceptance::Accepted(token))
    }

    /// Waits for an accepted on-demand run and returns its report.
    ///
    /// Each token can be awaited once.
    pub async fn wait(&self, token: &RefreshToken) -> Result<CollectionReport, CirrusError> {
        let slot = self.runs().get(&token.run_id);
        let Some(mut slot) = slot else {
            return Err(CirrusError::Internal(format!(
                "no tracked run with id {}",
                token.run_id
            )));
        };
        let report = slot
            .wait_for(Option::is_some)
            .await
            .map_err(|_| CirrusError::Internal(format!("run {} ended without a report", token.run_id)))?
            .clone();
        self.runs().remove(&token.run_id);
        report.ok_or_else(|| CirrusError::Internal(format!("run {} has no report", token.run_id)))
    }
}
