// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory transport implementing both RPC trait surfaces over
//! `tokio::sync::mpsc`/`oneshot` (§10's supplemented feature).
//!
//! This is not a wire codec — there is no serialization here, just message
//! passing between two in-process tasks — but it lets `pd-worker` and
//! `pd-orchestrator` drive each other through the full attach/execute/report
//! sequence in tests and in the `pd-cli` demo without a network listener.

use async_trait::async_trait;
use pd_core::pip::PipBuildRequest;
use pd_core::WorkerId;
use tokio::sync::{mpsc, oneshot};

use crate::error::RpcError;
use crate::orchestrator_api::{
    ExecutionLogInfo, HelloResponse, PipResultsInfo, ServiceLocation, WorkerCapacities,
};
use crate::transport::{OrchestratorRpc, WorkerRpc};
use crate::worker_api::{BuildEndData, BuildStartData, PerfCounters, WorkerExitResponse};

fn closed<T>(_: T) -> RpcError {
    RpcError::TransportClosed
}

/// One call addressed to a worker's RPC server.
pub enum WorkerCall {
    Attach(BuildStartData, oneshot::Sender<Result<(), RpcError>>),
    ExecutePips(PipBuildRequest, oneshot::Sender<Result<(), RpcError>>),
    Exit(BuildEndData, oneshot::Sender<Result<WorkerExitResponse, RpcError>>),
    Heartbeat(PerfCounters, oneshot::Sender<Result<(), RpcError>>),
}

/// Client handle the orchestrator holds per attached worker.
#[derive(Clone)]
pub struct LocalWorkerTransport {
    sender: mpsc::Sender<WorkerCall>,
}

/// Server-side receiver a worker's dispatch loop drains.
pub struct WorkerInbox {
    receiver: mpsc::Receiver<WorkerCall>,
}

impl WorkerInbox {
    pub async fn recv(&mut self) -> Option<WorkerCall> {
        self.receiver.recv().await
    }
}

/// Create a linked client/server pair for the worker RPC surface.
pub fn worker_channel(buffer: usize) -> (LocalWorkerTransport, WorkerInbox) {
    let (sender, receiver) = mpsc::channel(buffer);
    (LocalWorkerTransport { sender }, WorkerInbox { receiver })
}

#[async_trait]
impl WorkerRpc for LocalWorkerTransport {
    async fn attach(&self, request: BuildStartData) -> Result<(), RpcError> {
        let (tx, rx) = oneshot::channel();
        self.sender.send(WorkerCall::Attach(request, tx)).await.map_err(closed)?;
        rx.await.map_err(closed)?
    }

    async fn execute_pips(&self, request: PipBuildRequest) -> Result<(), RpcError> {
        let (tx, rx) = oneshot::channel();
        self.sender.send(WorkerCall::ExecutePips(request, tx)).await.map_err(closed)?;
        rx.await.map_err(closed)?
    }

    async fn exit(&self, request: BuildEndData) -> Result<WorkerExitResponse, RpcError> {
        let (tx, rx) = oneshot::channel();
        self.sender.send(WorkerCall::Exit(request, tx)).await.map_err(closed)?;
        rx.await.map_err(closed)?
    }

    async fn heartbeat(&self, request: PerfCounters) -> Result<(), RpcError> {
        let (tx, rx) = oneshot::channel();
        self.sender.send(WorkerCall::Heartbeat(request, tx)).await.map_err(closed)?;
        rx.await.map_err(closed)?
    }
}

/// One call addressed to the orchestrator's RPC server.
pub enum OrchestratorCall {
    Hello(
        ServiceLocation,
        Option<WorkerId>,
        oneshot::Sender<Result<HelloResponse, RpcError>>,
    ),
    AttachCompleted(WorkerCapacities, Vec<u8>, oneshot::Sender<Result<(), RpcError>>),
    ReportPipResults(PipResultsInfo, oneshot::Sender<Result<(), RpcError>>),
    ReportExecutionLog(ExecutionLogInfo, oneshot::Sender<Result<(), RpcError>>),
}

/// Client handle a worker holds for its one orchestrator.
#[derive(Clone)]
pub struct LocalOrchestratorTransport {
    sender: mpsc::Sender<OrchestratorCall>,
}

/// Server-side receiver the orchestrator's per-worker dispatch loop drains.
pub struct OrchestratorInbox {
    receiver: mpsc::Receiver<OrchestratorCall>,
}

impl OrchestratorInbox {
    pub async fn recv(&mut self) -> Option<OrchestratorCall> {
        self.receiver.recv().await
    }
}

/// Create a linked client/server pair for the orchestrator RPC surface.
pub fn orchestrator_channel(buffer: usize) -> (LocalOrchestratorTransport, OrchestratorInbox) {
    let (sender, receiver) = mpsc::channel(buffer);
    (LocalOrchestratorTransport { sender }, OrchestratorInbox { receiver })
}

#[async_trait]
impl OrchestratorRpc for LocalOrchestratorTransport {
    async fn hello(
        &self,
        location: ServiceLocation,
        requested_id: Option<WorkerId>,
    ) -> Result<HelloResponse, RpcError> {
        let (tx, rx) = oneshot::channel();
        self.sender.send(OrchestratorCall::Hello(location, requested_id, tx)).await.map_err(closed)?;
        rx.await.map_err(closed)?
    }

    async fn attach_completed(
        &self,
        capacities: WorkerCapacities,
        cache_validation_hash: Vec<u8>,
    ) -> Result<(), RpcError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(OrchestratorCall::AttachCompleted(capacities, cache_validation_hash, tx))
            .await
            .map_err(closed)?;
        rx.await.map_err(closed)?
    }

    async fn report_pip_results(&self, info: PipResultsInfo) -> Result<(), RpcError> {
        let (tx, rx) = oneshot::channel();
        self.sender.send(OrchestratorCall::ReportPipResults(info, tx)).await.map_err(closed)?;
        rx.await.map_err(closed)?
    }

    async fn report_execution_log(&self, info: ExecutionLogInfo) -> Result<(), RpcError> {
        let (tx, rx) = oneshot::channel();
        self.sender.send(OrchestratorCall::ReportExecutionLog(info, tx)).await.map_err(closed)?;
        rx.await.map_err(closed)?
    }
}

#[cfg(test)]
#[path = "local_transport_tests.rs"]
mod tests;
