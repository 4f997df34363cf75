// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use pd_core::pip::{ExpectedMemoryCounters, PathRef, PipType, SealedDirectoryRef};
use pd_core::{InvocationId, WorkerId};
use pd_wire::error::RpcError;
use pd_wire::orchestrator_api::{ExecutionLogInfo, HelloResponse, PipResultsInfo, ServiceLocation, WorkerCapacities};
use pd_wire::transport::OrchestratorRpc;

use super::*;
use crate::notify::NotificationManager;
use crate::scheduler::{FakeFileContentManager, FakeScheduler};

#[derive(Default, Clone)]
struct RecordingOrchestrator {
    batches: Arc<Mutex<Vec<PipResultsInfo>>>,
}

#[async_trait]
impl OrchestratorRpc for RecordingOrchestrator {
    async fn hello(&self, _location: ServiceLocation, _requested_id: Option<pd_core::WorkerId>) -> Result<HelloResponse, RpcError> {
        unreachable!()
    }
    async fn attach_completed(&self, _capacities: WorkerCapacities, _cache_validation_hash: Vec<u8>) -> Result<(), RpcError> {
        unreachable!()
    }
    async fn report_pip_results(&self, info: PipResultsInfo) -> Result<(), RpcError> {
        self.batches.lock().push(info);
        Ok(())
    }
    async fn report_execution_log(&self, _info: ExecutionLogInfo) -> Result<(), RpcError> {
        unreachable!()
    }
}

fn request(pip_id: u32, step: PipStep, sequence_number: u64) -> SinglePipBuildRequest {
    SinglePipBuildRequest {
        pip_id: PipId::new(pip_id),
        step,
        pip_type: PipType::Process,
        priority: 0,
        fingerprint: Vec::new(),
        expected_memory_counters: ExpectedMemoryCounters::default(),
        activity_id: "a1".to_string(),
        sequence_number,
    }
}

async fn harness() -> (RequestIntake<FakeScheduler, RecordingOrchestrator>, Arc<RecordingOrchestrator>, FakeScheduler) {
    let orchestrator = Arc::new(RecordingOrchestrator::default());
    let manager = NotificationManager::new(orchestrator.clone(), InvocationId::new("a1", "test"), WorkerId::new(1));
    let (handle, _task) = manager.spawn();
    let scheduler = FakeScheduler::new();
    let intake = RequestIntake::new(Arc::new(scheduler.clone()), handle);
    (intake, orchestrator, scheduler)
}

#[tokio::test]
async fn admitting_a_request_dispatches_it_to_the_scheduler_and_tracks_it() {
    let (intake, _orchestrator, scheduler) = harness().await;
    intake.admit(request(1, PipStep::ExecuteProcess, 10)).await.unwrap();
    assert_eq!(scheduler.started(), vec![(PipId::new(1), PipStep::ExecuteProcess)]);
}

#[tokio::test]
async fn a_successful_completion_clears_the_pending_slot() {
    let (intake, _orchestrator, _scheduler) = harness().await;
    intake.admit(request(2, PipStep::ExecuteProcess, 11)).await.unwrap();
    assert_eq!(intake.pending_count(), 0);
}

#[tokio::test]
async fn a_repeated_sequence_number_is_a_no_op_and_does_not_redispatch() {
    let (intake, _orchestrator, scheduler) = harness().await;
    intake.admit(request(3, PipStep::ExecuteProcess, 20)).await.unwrap();
    intake.admit(request(3, PipStep::ExecuteProcess, 20)).await.unwrap();
    assert_eq!(scheduler.started().len(), 1);
}

#[tokio::test]
async fn a_non_materialize_outputs_step_with_a_non_process_non_ipc_pip_type_is_rejected() {
    let (intake, _orchestrator, scheduler) = harness().await;
    let mut bad = request(4, PipStep::ExecuteProcess, 30);
    bad.pip_type = PipType::Other;
    let result = intake.admit(bad).await;
    assert!(result.is_err());
    assert!(scheduler.started().is_empty());
}

#[tokio::test]
async fn materialize_outputs_is_exempt_from_the_pip_type_assertion() {
    let (intake, _orchestrator, scheduler) = harness().await;
    let mut fire_forget = request(5, PipStep::MaterializeOutputs, 40);
    fire_forget.pip_type = PipType::Other;
    assert!(intake.admit(fire_forget).await.is_ok());
    assert_eq!(scheduler.started(), vec![(PipId::new(5), PipStep::MaterializeOutputs)]);
}

#[tokio::test]
async fn input_reporter_counts_rejected_hashes_and_groups_dynamic_directory_members() {
    let content_manager = Arc::new(FakeFileContentManager::new());
    content_manager.reject(vec![0xAA]);
    let reporter = InputReporter::new(content_manager.clone());

    let directory = SealedDirectoryRef { dir_path: PathRef::Dynamic("out/opaque".to_string()), seal_id: 7, is_shared_opaque: true };
    let hashes = vec![
        FileArtifactKeyedHash {
            path: PathRef::Dynamic("out/opaque/a.txt".to_string()),
            rewrite_count: 0,
            hash: vec![0x01],
            size: 4,
            associated_directories: vec![directory.clone()],
            is_source_affected: false,
            is_allowed_file_rewrite: false,
        },
        FileArtifactKeyedHash {
            path: PathRef::Dynamic("out/opaque/b.txt".to_string()),
            rewrite_count: 0,
            hash: vec![0xAA],
            size: 4,
            associated_directories: vec![directory],
            is_source_affected: false,
            is_allowed_file_rewrite: false,
        },
    ];

    let failures = reporter.report(&hashes).await;
    assert_eq!(failures, 1);
    assert_eq!(content_manager.reported_hashes().len(), 2);
}
