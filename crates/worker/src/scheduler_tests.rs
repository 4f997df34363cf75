// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use parking_lot::Mutex;
use pd_core::ids::PipId;

use super::*;

struct RecordingObserver {
    outcomes: Arc<Mutex<Vec<ExecutionOutcome>>>,
}

impl StepObserver for RecordingObserver {
    fn on_end(&self, outcome: ExecutionOutcome) {
        self.outcomes.lock().push(outcome);
    }
}

#[tokio::test]
async fn fake_scheduler_completes_with_a_default_result_by_default() {
    let scheduler = FakeScheduler::new();
    let outcomes = Arc::new(Mutex::new(Vec::new()));
    let observer = Arc::new(RecordingObserver { outcomes: outcomes.clone() });

    scheduler.start_pip_step(PipId::new(1), PipStep::ExecuteProcess, 0, observer).await;

    assert_eq!(scheduler.started(), vec![(PipId::new(1), PipStep::ExecuteProcess)]);
    assert_eq!(outcomes.lock().len(), 1);
    assert!(matches!(outcomes.lock()[0], ExecutionOutcome::Completed(_)));
}

#[tokio::test]
async fn fake_scheduler_honors_a_queued_failure_outcome() {
    let scheduler = FakeScheduler::new();
    scheduler.queue_outcome(
        PipId::new(2),
        PipStep::ExecuteProcess,
        ExecutionOutcome::Failed { pip_id: PipId::new(2), step: PipStep::ExecuteProcess, message: "boom".to_string() },
    );
    let outcomes = Arc::new(Mutex::new(Vec::new()));
    let observer = Arc::new(RecordingObserver { outcomes: outcomes.clone() });

    scheduler.start_pip_step(PipId::new(2), PipStep::ExecuteProcess, 0, observer).await;

    assert!(matches!(outcomes.lock()[0], ExecutionOutcome::Failed { .. }));
}

#[tokio::test]
async fn fake_content_manager_rejects_only_marked_hashes() {
    let manager = FakeFileContentManager::new();
    manager.reject(vec![0xAA]);

    let accepted = FileArtifactKeyedHash {
        path: pd_core::pip::PathRef::Dynamic("ok.txt".to_string()),
        rewrite_count: 0,
        hash: vec![0x01],
        size: 10,
        associated_directories: Vec::new(),
        is_source_affected: false,
        is_allowed_file_rewrite: false,
    };
    let rejected = FileArtifactKeyedHash { hash: vec![0xAA], ..accepted.clone() };

    assert!(manager.report_worker_pip_input_content(&accepted).await);
    assert!(!manager.report_worker_pip_input_content(&rejected).await);
    assert_eq!(manager.reported_hashes(), vec![vec![0x01], vec![0xAA]]);
}
