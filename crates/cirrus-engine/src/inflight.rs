// SPDX-FileCopyrightText: 2026 Cirrus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process-wide registry of triples currently being collected.
//!
//! A triple is claimed before it is handed to the worker pool and released
//! when its [`TripleClaim`] is dropped, which happens only after the
//! collector call and its writes have finished. Two runs can therefore never
//! execute the same triple at once.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use cirrus_core::Triple;

use crate::recording;

#[derive(Debug, Clone, Default)]
pub struct InFlightRegistry {
    active: Arc<Mutex<HashSet<Triple>>>,
}

impl InFlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<Triple>> {
        self.active.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Claims every triple, or none of them.
    ///
    /// On overlap nothing is claimed and the number of already-active
    /// triples is returned.
    pub fn try_claim_all(&self, triples: &[Triple]) -> Result<Vec<TripleClaim>, usize> {
        let mut active = self.lock();
        let overlapping = triples.iter().filter(|t| active.contains(*t)).count();
        if overlapping > 0 {
            return Err(overlapping);
        }
        active.extend(triples.iter().cloned());
        recording::set_in_flight(active.len());
        Ok(triples.iter().cloned().map(|t| self.claim(t)).collect())
    }

    /// Claims whatever is free. Returns the claims and the triples that were busy.
    pub fn claim_available(&self, triples: Vec<Triple>) -> (Vec<TripleClaim>, Vec<Triple>) {
        let mut active = self.lock();
        let mut claimed = Vec::with_capacity(triples.len());
        let mut busy = Vec::new();
        for triple in triples {
            if active.insert(triple.clone()) {
                claimed.push(self.claim(triple));
            } else {
                busy.push(triple);
            }
        }
        recording::set_in_flight(active.len());
        (claimed, busy)
    }

    pub fn contains(&self, triple: &Triple) -> bool {
        self.lock().contains(triple)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn claim(&self, triple: Triple) -> TripleClaim {
        TripleClaim {
            triple,
            registry: self.clone(),
        }
    }
}

/// Ownership of one in-flight triple. Dropping it releases the triple.
#[derive(Debug)]
pub struct TripleClaim {
    triple: Triple,
    registry: InFlightRegistry,
}

impl TripleClaim {
    pub fn triple(&self) -> &Triple {
        &self.triple
    }
}

impl Drop for TripleClaim {
    fn drop(&mut self) {
        let mut active = self.registry.lock();
        active.remove(&self.triple);
        recording::set_in_flight(active.len());
    }
}
