// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::*;

#[test]
fn forward_transitions_succeed_in_order() {
    let sm = LifecycleSm::new();
    assert_eq!(sm.status(), WorkerStatus::NotStarted);
    assert!(sm.try_transition(WorkerStatus::Starting));
    assert!(sm.try_transition(WorkerStatus::Started));
    assert!(sm.try_transition(WorkerStatus::Running));
    assert_eq!(sm.status(), WorkerStatus::Running);
}

#[test]
fn backward_transition_is_rejected() {
    let sm = LifecycleSm::new();
    assert!(sm.try_transition(WorkerStatus::Running));
    assert!(!sm.try_transition(WorkerStatus::Starting));
    assert_eq!(sm.status(), WorkerStatus::Running);
}

#[test]
fn redundant_transition_to_same_state_is_rejected() {
    let sm = LifecycleSm::new();
    assert!(sm.try_transition(WorkerStatus::Started));
    assert!(!sm.try_transition(WorkerStatus::Started));
}

#[test]
fn repeated_stop_requests_coalesce() {
    let sm = LifecycleSm::new();
    assert!(sm.try_transition(WorkerStatus::Stopping));
    assert!(sm.try_transition(WorkerStatus::Stopped));
    // Second stop request is a no-op, not an error.
    assert!(!sm.try_transition(WorkerStatus::Stopped));
    assert_eq!(sm.status(), WorkerStatus::Stopped);
}

#[test]
fn sink_states_reachable_from_any_non_sink_state() {
    let sm = LifecycleSm::new();
    // Jump straight from NotStarted to Stopped, skipping Starting/Stopping.
    assert!(sm.try_transition(WorkerStatus::Stopped));
    assert!(sm.status().is_terminal());
}

#[test]
fn running_entry_marks_ever_available_and_it_stays_set_after_stop() {
    let sm = LifecycleSm::new();
    assert!(!sm.ever_available());
    assert!(sm.try_transition(WorkerStatus::Running));
    assert!(sm.ever_available());
    assert!(sm.try_transition(WorkerStatus::Stopped));
    assert!(sm.ever_available());
}

#[test]
fn never_running_worker_does_not_mark_ever_available() {
    let sm = LifecycleSm::new();
    assert!(sm.try_transition(WorkerStatus::Stopped));
    assert!(!sm.ever_available());
}

#[test]
fn observers_fire_on_every_successful_transition_only() {
    let sm = LifecycleSm::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let calls_clone = calls.clone();
    sm.add_observer(move |_from, _to| {
        calls_clone.fetch_add(1, Ordering::SeqCst);
    });

    assert!(sm.try_transition(WorkerStatus::Starting));
    assert!(!sm.try_transition(WorkerStatus::NotStarted));
    assert!(sm.try_transition(WorkerStatus::Running));

    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn illegal_transition_has_no_side_effects() {
    let sm = LifecycleSm::new();
    assert!(sm.try_transition(WorkerStatus::Started));
    let before = sm.status();
    assert!(!sm.try_transition(WorkerStatus::Starting));
    assert_eq!(sm.status(), before);
}

#[test]
fn concurrent_transitions_apply_exactly_once_each() {
    use std::thread;

    let sm = Arc::new(LifecycleSm::new());
    let mut handles = Vec::new();
    for _ in 0..8 {
        let sm = sm.clone();
        handles.push(thread::spawn(move || sm.try_transition(WorkerStatus::Running)));
    }
    let successes: usize = handles.into_iter().map(|h| h.join().unwrap() as usize).sum();
    assert_eq!(successes, 1);
    assert_eq!(sm.status(), WorkerStatus::Running);
}
