// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use pd_core::pip::EventLevel;
use pd_wire::worker_api::EventCount;

use super::*;

fn event(event_id: u32) -> EventMessage {
    EventMessage { event_id, level: EventLevel::Informational, text: String::new(), pip_semi_stable_hash: None }
}

#[test]
fn matching_counts_produce_no_mismatches() {
    let reconciler = EventStatsReconciler::new();
    reconciler.observe(&[event(1), event(1), event(2)]);
    let response = WorkerExitResponse { event_counts: vec![EventCount { event_id: 1, count: 2 }, EventCount { event_id: 2, count: 1 }] };
    assert!(reconciler.reconcile(&response).is_empty());
}

#[test]
fn a_higher_reported_count_than_received_is_flagged_as_dropped_events() {
    let reconciler = EventStatsReconciler::new();
    reconciler.observe(&[event(5)]);
    let response = WorkerExitResponse { event_counts: vec![EventCount { event_id: 5, count: 3 }] };
    let mismatches = reconciler.reconcile(&response);
    assert_eq!(mismatches, vec![EventCountMismatch { event_id: 5, reported: 3, received: 1 }]);
}

#[test]
fn an_event_id_never_received_at_all_is_flagged() {
    let reconciler = EventStatsReconciler::new();
    let response = WorkerExitResponse { event_counts: vec![EventCount { event_id: 9, count: 1 }] };
    let mismatches = reconciler.reconcile(&response);
    assert_eq!(mismatches, vec![EventCountMismatch { event_id: 9, reported: 1, received: 0 }]);
}
