// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! DTOs for the orchestrator-side RPC surface (§6.2): `Hello`,
//! `AttachCompleted`, `ReportPipResults`, `ReportExecutionLog`.

use pd_core::{EventMessage, ExecutionLogBlob, InvocationId, PipCompletionData, WorkerId};
use serde::{Deserialize, Serialize};

/// Where a worker's RPC server can be reached, reported on `Hello`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceLocation {
    pub host: String,
    pub port: u16,
}

/// `Hello` response. `Released`/`NoSlots` are graceful early-exit signals
/// (§7), not failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum HelloResponse {
    Ok { worker_id: WorkerId },
    Released,
    NoSlots,
}

/// Capacities reported at `AttachCompleted`, used by the orchestrator to
/// decide how much work to route to this worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerCapacities {
    pub total_process_slots: u32,
    pub available_process_slots: u32,
    pub total_ipc_slots: u32,
    pub available_ipc_slots: u32,
}

/// `ReportPipResults` request body. One worker batches any number of
/// completions and forwarded events per call (§4.4), plus whatever the
/// build-manifest execution-log stream had buffered when this cycle's
/// forced flush ran.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipResultsInfo {
    pub invocation_id: InvocationId,
    pub worker_id: WorkerId,
    pub batch_sequence_number: u64,
    pub results: Vec<PipCompletionData>,
    pub events: Vec<EventMessage>,
    #[serde(default)]
    pub build_manifest_log: Option<ExecutionLogBlob>,
}

/// `ReportExecutionLog` request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionLogInfo {
    pub invocation_id: InvocationId,
    pub worker_id: WorkerId,
    pub blob: ExecutionLogBlob,
}
