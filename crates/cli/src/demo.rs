// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wires a `pd_worker::Worker` and a `pd_orchestrator::RemoteWorkerDriver`
//! together over `pd_wire::local_transport`'s in-memory channels and drives
//! them through attach, one batch of pip steps, and exit — enough to
//! exercise both crates end to end without a real network transport (§1).

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use pd_core::pip::{ExpectedMemoryCounters, PipStep, PipType, SinglePipBuildRequest};
use pd_core::{InvocationId, PipId, SystemClock, WorkerId};
use pd_orchestrator::{OrchestratorConfig, RemoteWorkerDriver};
use pd_wire::local_transport::{orchestrator_channel, worker_channel};
use pd_worker::scheduler::{FakeFileContentManager, FakeScheduler};
use pd_worker::{Worker, WorkerConfig};

pub async fn run(worker_config_path: Option<PathBuf>, orchestrator_config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let worker_id = WorkerId::new(1);
    let invocation_id = InvocationId::new("demo-activity", "local");
    let session_id = "demo-session".to_string();

    let worker_config = WorkerConfig::load(worker_config_path.as_deref()).context("loading worker config")?;
    let orchestrator_config =
        OrchestratorConfig::load(orchestrator_config_path.as_deref()).context("loading orchestrator config")?;

    let (worker_rpc, worker_inbox) = worker_channel(32);
    let (orchestrator_rpc, orchestrator_inbox) = orchestrator_channel(32);

    let worker = Worker::new(
        worker_id,
        invocation_id.clone(),
        worker_config,
        SystemClock,
        Arc::new(FakeScheduler::new()),
        Arc::new(FakeFileContentManager::new()),
        Arc::new(orchestrator_rpc),
    );
    let driver = RemoteWorkerDriver::new(
        worker_id,
        invocation_id.clone(),
        session_id,
        orchestrator_config,
        SystemClock,
        Arc::new(worker_rpc),
    );

    tokio::spawn({
        let worker = worker.clone();
        async move {
            if let Err(error) = worker.serve(worker_inbox).await {
                tracing::warn!(%error, "worker stopped serving");
            }
        }
    });
    tokio::spawn({
        let driver = driver.clone();
        async move {
            if let Err(error) = driver.serve(orchestrator_inbox).await {
                tracing::warn!(%error, "driver stopped serving");
            }
        }
    });

    driver.run_attach_loop().await.context("attach loop failed")?;

    let mut waited = Duration::ZERO;
    while !driver.is_attached() {
        if waited > Duration::from_secs(2) {
            bail!("worker never reported AttachCompleted");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
        waited += Duration::from_millis(10);
    }
    println!("attached, capacities: {:?}", driver.capacities());

    let request = SinglePipBuildRequest {
        pip_id: PipId::new(1),
        step: PipStep::ExecuteProcess,
        pip_type: PipType::Process,
        priority: 0,
        fingerprint: Vec::new(),
        expected_memory_counters: ExpectedMemoryCounters::default(),
        activity_id: "demo-activity".to_string(),
        sequence_number: 1,
    };
    match driver.enqueue_step(request, Vec::new()).await {
        Ok(Some(result)) => println!("pip {} completed: {:?}", result.pip_id, result.result_blob),
        Ok(None) => println!("pip enqueued fire-and-forget"),
        Err(decision) => println!("pip step failed, retry decision: {decision:?}"),
    }

    let exit_response = driver.disconnect(pd_core::ConnectionFailureCause::UnrecoverableFailure, None).await;
    println!("exit response: {}", serde_json::to_string_pretty(&exit_response)?);
    println!("final worker health: {}", serde_json::to_string_pretty(&worker.health())?);

    Ok(())
}
