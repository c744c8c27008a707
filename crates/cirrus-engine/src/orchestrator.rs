// SPDX-FileCopyrightText: 2026 Cirrus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collection orchestrator: fans a scope out over a bounded worker pool and
//! commits each triple independently.
//!
//! Per triple, a worker obtains a credential, runs the collector and, only
//! once the full listing is in hand, replaces the triple's records in one
//! reconciling write. A failure anywhere leaves the stored records alone
//! and is recorded in the freshness ledger. Failures never cross triples
//! and are never retried within a run.

use std::collections::{BTreeSet, HashSet};
use std::future::pending;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cirrus_config::CollectionConfig;
use cirrus_core::{
    AccountDirectory, CirrusError, CollectionScope, CollectorRegistry, CredentialProvider,
    FreshnessFilter, FreshnessLedger, InventoryStore, ReplaceOutcome, ResourceRecord, RunId,
    RunStamp, Triple, TriggerKind, now_millis,
};
use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, Semaphore};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::inflight::{InFlightRegistry, TripleClaim};
use crate::planner::expand_scope;
use crate::recording;
use crate::report::{CollectionReport, SkipReason, TripleFailure};

/// Ledger error text for triples cancelled by the wall-clock ceiling.
pub const RUN_TIMEOUT_MESSAGE: &str = "run timeout";

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Supported regions for regional services.
    pub regions: Vec<String>,
    pub max_concurrency: usize,
    pub retention: chrono::Duration,
    /// The account the ambient credential belongs to. Its triples skip role assumption.
    pub local_account_id: Option<String>,
}

impl OrchestratorSettings {
    pub fn from_config(config: &CollectionConfig, local_account_id: Option<String>) -> Self {
        Self {
            regions: config.regions.clone(),
            max_concurrency: config.max_concurrency,
            retention: chrono::Duration::days(i64::from(config.retention_days)),
            local_account_id,
        }
    }
}

/// Per-run knobs.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub run_id: RunId,
    pub trigger: TriggerKind,
    /// Wall-clock ceiling. `None` runs to completion.
    pub deadline: Option<Duration>,
    /// Skip triples whose last success is younger than this.
    pub skip_fresh_within: Option<chrono::Duration>,
    /// Process shutdown. Once cancelled, queued triples never start.
    pub shutdown: CancellationToken,
}

impl RunOptions {
    pub fn scheduled(deadline: Duration, skip_fresh_within: Option<chrono::Duration>) -> Self {
        Self {
            run_id: RunId::generate(),
            trigger: TriggerKind::Scheduled,
            deadline: Some(deadline),
            skip_fresh_within,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn on_demand() -> Self {
        Self {
            run_id: RunId::generate(),
            trigger: TriggerKind::OnDemand,
            deadline: None,
            skip_fresh_within: None,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }
}

/// How the collection loop of a run ended.
enum Ending {
    Complete,
    TimedOut,
    Shutdown,
}

struct Inner {
    directory: Arc<dyn AccountDirectory>,
    credentials: Arc<dyn CredentialProvider>,
    registry: CollectorRegistry,
    store: Arc<dyn InventoryStore>,
    ledger: Arc<dyn FreshnessLedger>,
    inflight: InFlightRegistry,
    settings: OrchestratorSettings,
}

/// Cheap to clone; clones share the worker state and the in-flight registry.
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("directory", &self.inner.directory.name())
            .field("registry", &self.inner.registry)
            .field("in_flight", &self.inner.inflight.len())
            .field("settings", &self.inner.settings)
            .finish()
    }
}

impl Orchestrator {
    pub fn new(
        directory: Arc<dyn AccountDirectory>,
        credentials: Arc<dyn CredentialProvider>,
        registry: CollectorRegistry,
        store: Arc<dyn InventoryStore>,
        ledger: Arc<dyn FreshnessLedger>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                directory,
                credentials,
                registry,
                store,
                ledger,
                inflight: InFlightRegistry::new(),
                settings,
            }),
        }
    }

    pub fn inflight(&self) -> &InFlightRegistry {
        &self.inner.inflight
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.inner.settings
    }

    /// Expands `scope` into triples. Fails only when the account list is unavailable.
    pub async fn plan(&self, scope: &CollectionScope) -> Result<Vec<Triple>, CirrusError> {
        let accounts = self.inner.directory.list_accounts().await?;
        Ok(expand_scope(
            scope,
            &accounts,
            &self.inner.registry,
            &self.inner.settings.regions,
        ))
    }

    /// Runs `scope` to completion or deadline. Never fails: every problem is
    /// captured in the report.
    ///
    /// Triples already claimed by another run are skipped as `in-progress`.
    pub async fn run(&self, scope: &CollectionScope, options: RunOptions) -> CollectionReport {
        let mut report =
            CollectionReport::begin(options.run_id.clone(), options.trigger, now_millis());

        let triples = match self.plan(scope).await {
            Ok(triples) => triples,
            Err(err) => {
                error!(
                    run_id = %options.run_id,
                    trigger = %options.trigger,
                    error = %err,
                    "run aborted before collection"
                );
                report.abort(&err);
                report.finished_at = now_millis();
                return report;
            }
        };

        let triples = self
            .drop_fresh(triples, options.skip_fresh_within, &mut report)
            .await;
        let (claims, busy) = self.inner.inflight.claim_available(triples);
        for triple in busy {
            debug!(%triple, "triple already in flight, skipping");
            report.skip(triple, SkipReason::InProgress);
        }

        self.execute(claims, &options, report).await
    }

    async fn drop_fresh(
        &self,
        triples: Vec<Triple>,
        window: Option<chrono::Duration>,
        report: &mut CollectionReport,
    ) -> Vec<Triple> {
        let Some(window) = window.filter(|w| *w > chrono::Duration::zero()) else {
            return triples;
        };
        let records = match self.inner.ledger.freshness(&FreshnessFilter::default()).await {
            Ok(records) => records,
            Err(err) => {
                warn!(error = %err, "freshness lookup failed, collecting everything");
                return triples;
            }
        };
        let cutoff = now_millis() - window;
        let fresh: HashSet<Triple> = records
            .iter()
            .filter(|r| r.last_success_at.is_some_and(|at| at > cutoff))
            .map(|r| r.triple())
            .collect();

        let mut kept = Vec::with_capacity(triples.len());
        for triple in triples {
            if fresh.contains(&triple) {
                report.skip(triple, SkipReason::Fresh);
            } else {
                kept.push(triple);
            }
        }
        kept
    }

    /// Executes already-claimed triples and completes `report`.
    pub(crate) async fn execute(
        &self,
        claims: Vec<TripleClaim>,
        options: &RunOptions,
        mut report: CollectionReport,
    ) -> CollectionReport {
        let clock = Instant::now();
        let run_id = options.run_id.clone();
        report.attempted = claims.len();
        info!(
            run_id = %run_id,
            trigger = %options.trigger,
            triples = claims.len(),
            skipped = report.skipped.len(),
            "run started"
        );

        let semaphore = Arc::new(Semaphore::new(self.inner.settings.max_concurrency.max(1)));
        let cancel = options.shutdown.child_token();
        let started: Arc<Mutex<HashSet<Triple>>> = Arc::default();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut pending_triples: BTreeSet<Triple> =
            claims.iter().map(|c| c.triple().clone()).collect();

        for claim in claims {
            let worker = self.clone();
            let semaphore = Arc::clone(&semaphore);
            let cancel = cancel.clone();
            let started = Arc::clone(&started);
            let tx = tx.clone();
            let run_id = run_id.clone();
            tokio::spawn(async move {
                let _permit = tokio::select! {
                    permit = semaphore.acquire_owned() => match permit {
                        Ok(permit) => permit,
                        Err(_) => return,
                    },
                    () = cancel.cancelled() => return,
                };
                {
                    let mut started = started.lock().unwrap_or_else(|e| e.into_inner());
                    if cancel.is_cancelled() {
                        return;
                    }
                    started.insert(claim.triple().clone());
                }
                let triple = claim.triple().clone();
                let result = worker.collect_triple(&triple, &run_id).await;
                drop(claim);
                // The receiver is gone once the run has timed out; the outcome
                // is already in the ledger.
                let _ = tx.send((triple, result));
            });
        }
        drop(tx);

        let deadline = options.deadline.map(|d| clock + d);
        let ending = loop {
            if pending_triples.is_empty() {
                break Ending::Complete;
            }
            tokio::select! {
                received = rx.recv() => match received {
                    Some((triple, result)) => {
                        pending_triples.remove(&triple);
                        match result {
                            Ok(outcome) => report.record_success(outcome),
                            Err(err) => report.record_failure(TripleFailure::new(triple, &err)),
                        }
                    }
                    None => break Ending::Complete,
                },
                () = wait_until(deadline) => break Ending::TimedOut,
                () = options.shutdown.cancelled() => break Ending::Shutdown,
            }
        };

        match ending {
            Ending::TimedOut => {
                let ceiling = options.deadline.unwrap_or_default();
                self.abandon(&run_id, ceiling, &cancel, &started, pending_triples, &mut report)
                    .await;
            }
            Ending::Shutdown => {
                warn!(run_id = %run_id, unfinished = pending_triples.len(), "shutdown requested, queued triples cancelled");
                for triple in pending_triples {
                    let err = CirrusError::Internal("cancelled by shutdown".into());
                    report.record_failure(TripleFailure::new(triple, &err));
                }
            }
            Ending::Complete => {
                for triple in pending_triples {
                    let err = CirrusError::Internal("worker exited without reporting".into());
                    error!(%triple, run_id = %run_id, "worker exited without reporting");
                    report.record_failure(TripleFailure::new(triple, &err));
                }
            }
        }

        report.finished_at = now_millis();
        recording::record_run_duration(options.trigger, clock.elapsed().as_secs_f64());
        info!(
            run_id = %run_id,
            trigger = %options.trigger,
            succeeded = report.succeeded,
            failed = report.failed,
            skipped = report.skipped.len(),
            resources_written = report.resources_written,
            resources_removed = report.resources_removed,
            elapsed_ms = clock.elapsed().as_millis() as u64,
            "run finished"
        );
        report
    }

    /// Deadline handling. Queued triples are cancelled and their timeout is
    /// recorded in the ledger. Running triples are left to finish on their own
    /// and write their own outcome.
    async fn abandon(
        &self,
        run_id: &RunId,
        ceiling: Duration,
        cancel: &CancellationToken,
        started: &Mutex<HashSet<Triple>>,
        pending_triples: BTreeSet<Triple>,
        report: &mut CollectionReport,
    ) {
        cancel.cancel();
        let running = started.lock().unwrap_or_else(|e| e.into_inner()).clone();
        let err = CirrusError::RunTimeout { ceiling };
        let now = now_millis();
        warn!(
            run_id = %run_id,
            unfinished = pending_triples.len(),
            ?ceiling,
            "run exceeded wall-clock ceiling"
        );

        for triple in pending_triples {
            recording::record_triple(triple.service, &err.kind().to_string());
            if running.contains(&triple) {
                debug!(%triple, "detaching running triple");
                report.record_failure(TripleFailure {
                    kind: err.kind(),
                    message: format!("{err}; still running, detached"),
                    triple,
                });
                continue;
            }
            if let Err(ledger_err) = self
                .inner
                .ledger
                .record_failure(&triple, now, RUN_TIMEOUT_MESSAGE)
                .await
            {
                error!(%triple, error = %ledger_err, "failed to record timeout in freshness ledger");
            }
            report.record_failure(TripleFailure::new(triple, &err));
        }
    }

    /// One triple, end to end, including its ledger entry.
    async fn collect_triple(
        &self,
        triple: &Triple,
        run_id: &RunId,
    ) -> Result<ReplaceOutcome, CirrusError> {
        let clock = Instant::now();
        match self.replace_from_listing(triple, run_id).await {
            Ok((outcome, collected_at)) => {
                recording::record_replace(triple.service, outcome);
                if let Err(err) = self
                    .inner
                    .ledger
                    .record_success(triple, collected_at, outcome.written as u64)
                    .await
                {
                    error!(%triple, run_id = %run_id, error = %err, "failed to record success in freshness ledger");
                    recording::record_triple(triple.service, &err.kind().to_string());
                    return Err(err);
                }
                recording::record_triple(triple.service, "success");
                info!(
                    service = %triple.service,
                    account_id = %triple.account_id,
                    region = %triple.region,
                    run_id = %run_id,
                    resources = outcome.written,
                    removed = outcome.removed,
                    elapsed_ms = clock.elapsed().as_millis() as u64,
                    "triple collected"
                );
                Ok(outcome)
            }
            Err(err) => {
                recording::record_triple(triple.service, &err.kind().to_string());
                warn!(
                    service = %triple.service,
                    account_id = %triple.account_id,
                    region = %triple.region,
                    run_id = %run_id,
                    kind = %err.kind(),
                    error = %err,
                    "triple collection failed, keeping stored records"
                );
                if let Err(ledger_err) = self
                    .inner
                    .ledger
                    .record_failure(triple, now_millis(), &err.to_string())
                    .await
                {
                    error!(%triple, error = %ledger_err, "failed to record failure in freshness ledger");
                }
                Err(err)
            }
        }
    }

    /// Credential, full listing, then one reconciling write. Nothing is
    /// written unless the listing completed.
    async fn replace_from_listing(
        &self,
        triple: &Triple,
        run_id: &RunId,
    ) -> Result<(ReplaceOutcome, DateTime<Utc>), CirrusError> {
        let collector = self.inner.registry.get(triple.service)?;
        let is_local =
            self.inner.settings.local_account_id.as_deref() == Some(triple.account_id.as_str());
        let credential = self
            .inner
            .credentials
            .credential(&triple.account_id, is_local, run_id)
            .await?;
        let found = collector.collect(&credential, &triple.region).await?;
        drop(credential);

        let stamp = RunStamp::new(run_id.clone(), now_millis(), self.inner.settings.retention);
        let records: Vec<ResourceRecord> = found
            .into_iter()
            .map(|resource| ResourceRecord::stamped(triple, &stamp, resource))
            .collect();
        let outcome = self.inner.store.replace_triple(triple, &stamp, records).await?;
        Ok((outcome, stamp.collected_at))
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => pending().await,
    }
}
