// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::*;

#[test]
fn first_fail_call_wins_and_runs_callbacks() {
    let supervisor = ConnectionSupervisor::new();
    let count = Arc::new(AtomicUsize::new(0));
    let count_clone = count.clone();
    supervisor.on_failure(move |_cause| {
        count_clone.fetch_add(1, Ordering::SeqCst);
    });

    assert!(supervisor.fail(ConnectionFailureCause::CallDeadlineExceeded));
    assert!(!supervisor.fail(ConnectionFailureCause::CallDeadlineExceeded));
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn second_failure_cause_does_not_overwrite_the_first() {
    let supervisor = ConnectionSupervisor::new();
    supervisor.fail(ConnectionFailureCause::CallDeadlineExceeded);
    supervisor.fail(ConnectionFailureCause::HeartbeatFailure);
    assert_eq!(supervisor.cause(), Some(ConnectionFailureCause::CallDeadlineExceeded));
}

#[test]
fn late_registration_after_failure_still_fires_immediately() {
    let supervisor = ConnectionSupervisor::new();
    supervisor.fail(ConnectionFailureCause::UnrecoverableFailure);

    let observed = Arc::new(Mutex::new(None));
    let observed_clone = observed.clone();
    supervisor.on_failure(move |cause| {
        *observed_clone.lock() = Some(cause);
    });

    assert_eq!(*observed.lock(), Some(ConnectionFailureCause::UnrecoverableFailure));
}

#[test]
fn concurrent_fail_calls_trigger_exactly_one_drain() {
    use std::thread;

    let supervisor = Arc::new(ConnectionSupervisor::new());
    let count = Arc::new(AtomicUsize::new(0));
    let count_clone = count.clone();
    supervisor.on_failure(move |_cause| {
        count_clone.fetch_add(1, Ordering::SeqCst);
    });

    let mut handles = Vec::new();
    for _ in 0..8 {
        let supervisor = supervisor.clone();
        handles.push(thread::spawn(move || supervisor.fail(ConnectionFailureCause::HeartbeatFailure)));
    }
    let wins: usize = handles.into_iter().map(|h| h.join().unwrap() as usize).sum();
    assert_eq!(wins, 1);
    assert_eq!(count.load(Ordering::SeqCst), 1);
}
