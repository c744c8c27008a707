// SPDX-FileCopyrightText: 2026 Cirrus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The per-run outcome summary handed back to whoever started the run.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cirrus_core::{CirrusError, FailureKind, ReplaceOutcome, RunId, TriggerKind, Triple};

/// Why a triple in scope was not attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkipReason {
    /// Another run holds the triple.
    InProgress,
    /// It succeeded recently enough for a scheduled sweep to leave it alone.
    Fresh,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::InProgress => "in-progress",
            Self::Fresh => "fresh",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedTriple {
    pub triple: Triple,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripleFailure {
    pub triple: Triple,
    pub kind: FailureKind,
    pub message: String,
}

impl TripleFailure {
    pub fn new(triple: Triple, error: &CirrusError) -> Self {
        Self {
            triple,
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

/// A failure that stopped the run before any triple was attempted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunAbort {
    pub kind: FailureKind,
    pub message: String,
}

/// Aggregate outcome of one orchestration run.
///
/// `attempted` counts triples handed to the worker pool; each of them ends
/// up in exactly one of `succeeded` or `failed`. Skipped triples are not
/// attempted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionReport {
    pub run_id: RunId,
    pub trigger: TriggerKind,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: Vec<SkippedTriple>,
    pub resources_written: usize,
    pub resources_removed: usize,
    pub failures: Vec<TripleFailure>,
    pub aborted: Option<RunAbort>,
}

impl CollectionReport {
    pub(crate) fn begin(run_id: RunId, trigger: TriggerKind, started_at: DateTime<Utc>) -> Self {
        Self {
            run_id,
            trigger,
            started_at,
            finished_at: started_at,
            attempted: 0,
            succeeded: 0,
            failed: 0,
            skipped: Vec::new(),
            resources_written: 0,
            resources_removed: 0,
            failures: Vec::new(),
            aborted: None,
        }
    }

    pub(crate) fn record_success(&mut self, outcome: ReplaceOutcome) {
        self.succeeded += 1;
        self.resources_written += outcome.written;
        self.resources_removed += outcome.removed;
    }

    pub(crate) fn record_failure(&mut self, failure: TripleFailure) {
        self.failed += 1;
        self.failures.push(failure);
    }

    pub(crate) fn skip(&mut self, triple: Triple, reason: SkipReason) {
        self.skipped.push(SkippedTriple { triple, reason });
    }

    pub(crate) fn abort(&mut self, error: &CirrusError) {
        self.aborted = Some(RunAbort {
            kind: error.kind(),
            message: error.to_string(),
        });
    }

    /// True when nothing failed and the run was not aborted.
    pub fn is_clean(&self) -> bool {
        self.failed == 0 && self.aborted.is_none()
    }

    /// Failures that were caused by the wall-clock ceiling.
    pub fn timed_out(&self) -> impl Iterator<Item = &TripleFailure> {
        self.failures
            .iter()
            .filter(|f| f.kind == FailureKind::RunTimeout)
    }

    pub fn failure_for(&self, triple: &Triple) -> Option<&TripleFailure> {
        self.failures.iter().find(|f| &f.triple == triple)
    }

    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}
