// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event-stats reconciliation (§4.7): the orchestrator counts events by
//! `eventId` as they arrive in `ReportPipResults` batches, then compares that
//! tally against the `eventCounts` a worker reports at `Exit`. A mismatch
//! means the worker observed more events than made it across the wire —
//! never fatal, logged as a warning for post-build analysis.

use std::collections::HashMap;

use parking_lot::Mutex;
use pd_core::pip::EventMessage;
use pd_wire::worker_api::WorkerExitResponse;

#[derive(Default)]
pub struct EventStatsReconciler {
    received_counts: Mutex<HashMap<u32, u32>>,
}

/// One `eventId` whose received count didn't match what the worker reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventCountMismatch {
    pub event_id: u32,
    pub reported: u32,
    pub received: u32,
}

impl EventStatsReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record every event in a received batch against its `eventId`.
    pub fn observe(&self, events: &[EventMessage]) {
        let mut counts = self.received_counts.lock();
        for event in events {
            *counts.entry(event.event_id).or_insert(0) += 1;
        }
    }

    /// Compare the worker's reported per-event counts against what this
    /// reconciler actually received, logging every mismatch and returning
    /// them for callers that want to act on the discrepancy.
    pub fn reconcile(&self, exit_response: &WorkerExitResponse) -> Vec<EventCountMismatch> {
        let counts = self.received_counts.lock();
        let mut mismatches = Vec::new();
        for reported in &exit_response.event_counts {
            let received = counts.get(&reported.event_id).copied().unwrap_or(0);
            if received != reported.count {
                tracing::warn!(
                    event_id = reported.event_id,
                    reported = reported.count,
                    received,
                    "event count mismatch at exit, events were silently dropped"
                );
                mismatches.push(EventCountMismatch { event_id: reported.event_id, reported: reported.count, received });
            }
        }
        mismatches
    }
}

#[cfg(test)]
#[path = "stats_tests.rs"]
mod tests;
