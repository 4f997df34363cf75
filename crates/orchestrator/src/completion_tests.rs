// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use pd_core::pip::PipStep;
use pd_core::{ConnectionFailureCause, PipId};

use super::*;

fn completion(pip_id: u32, step: PipStep) -> PipCompletionData {
    PipCompletionData {
        pip_id: PipId::new(pip_id),
        step,
        result_blob: Vec::new(),
        execute_step_ticks: 0,
        queue_ticks: 0,
        thread_id: 0,
        start_time_ticks: 0,
        before_send_ticks: 0,
    }
}

#[tokio::test]
async fn a_registered_key_resolves_its_waiter() {
    let table = PipCompletionTable::new();
    let rx = table.register(PipStepKey::new(PipId::new(1), PipStep::ExecuteProcess));
    table.resolve(completion(1, PipStep::ExecuteProcess));
    let result = rx.await.unwrap();
    assert_eq!(result.unwrap().pip_id, PipId::new(1));
    assert_eq!(table.len(), 0);
}

#[tokio::test]
async fn an_unregistered_completion_is_silently_dropped() {
    let table = PipCompletionTable::new();
    table.resolve(completion(9, PipStep::ExecuteProcess));
    assert_eq!(table.len(), 0);
}

#[tokio::test]
async fn fail_all_resolves_every_waiter_with_a_retryable_failure() {
    let table = PipCompletionTable::new();
    let a = table.register(PipStepKey::new(PipId::new(1), PipStep::ExecuteProcess));
    let b = table.register(PipStepKey::new(PipId::new(2), PipStep::ExecuteProcess));

    table.fail_all(ConnectionFailureCause::ReconnectionTimeout);

    assert_eq!(a.await.unwrap().unwrap_err(), RetryableFailure(ConnectionFailureCause::ReconnectionTimeout));
    assert_eq!(b.await.unwrap().unwrap_err(), RetryableFailure(ConnectionFailureCause::ReconnectionTimeout));
    assert!(table.is_empty());
}

#[test]
fn materialize_outputs_never_escalates_to_distribution_failure() {
    assert_eq!(classify_failure(PipStep::MaterializeOutputs, 99, 3), RetryDecision::NotMaterialized);
}

#[test]
fn other_steps_retry_until_the_limit_then_become_terminal() {
    assert_eq!(classify_failure(PipStep::ExecuteProcess, 0, 3), RetryDecision::RemoteWorkerFailure);
    assert_eq!(classify_failure(PipStep::ExecuteProcess, 2, 3), RetryDecision::RemoteWorkerFailure);
    assert_eq!(classify_failure(PipStep::ExecuteProcess, 3, 3), RetryDecision::DistributionFailure);
}
