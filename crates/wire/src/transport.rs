// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Transport-facing RPC traits (§6.1/§6.2).
//!
//! Modeled as `async-trait` interfaces the same way this codebase models its
//! other network-facing collaborators (`crates/adapters/src/notify.rs`'s
//! `NotifyAdapter`): callers depend on the trait, not a concrete transport,
//! so the in-memory implementation in `local_transport` and a real network
//! implementation (out of scope here) are interchangeable.

use async_trait::async_trait;
use pd_core::pip::PipBuildRequest;

use crate::error::RpcError;
use crate::orchestrator_api::{ExecutionLogInfo, HelloResponse, PipResultsInfo, ServiceLocation};
use crate::worker_api::{BuildEndData, BuildStartData, PerfCounters, WorkerExitResponse};

/// Calls the orchestrator makes against an attached worker.
#[async_trait]
pub trait WorkerRpc: Send + Sync {
    async fn attach(&self, request: BuildStartData) -> Result<(), RpcError>;
    async fn execute_pips(&self, request: PipBuildRequest) -> Result<(), RpcError>;
    async fn exit(&self, request: BuildEndData) -> Result<WorkerExitResponse, RpcError>;
    async fn heartbeat(&self, request: PerfCounters) -> Result<(), RpcError>;
}

/// Calls a worker makes against the orchestrator.
#[async_trait]
pub trait OrchestratorRpc: Send + Sync {
    async fn hello(
        &self,
        location: ServiceLocation,
        requested_id: Option<pd_core::WorkerId>,
    ) -> Result<HelloResponse, RpcError>;

    async fn attach_completed(
        &self,
        capacities: crate::orchestrator_api::WorkerCapacities,
        cache_validation_hash: Vec<u8>,
    ) -> Result<(), RpcError>;

    async fn report_pip_results(&self, info: PipResultsInfo) -> Result<(), RpcError>;

    async fn report_execution_log(&self, info: ExecutionLogInfo) -> Result<(), RpcError>;
}
