// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! RPC surface DTOs and transport traits shared between the worker and the
//! orchestrator.
//!
//! This mirrors the split this codebase already makes between its protocol
//! DTOs and its transport: the message shapes live here, independent of how
//! bytes actually move between processes. A real wire codec is out of scope
//! (§1 of the distribution runtime's design); what's here is enough to drive
//! both sides' logic over any transport, including the in-memory one this
//! crate also provides for tests and the demo binary.

pub mod error;
pub mod orchestrator_api;
pub mod transport;
pub mod worker_api;

pub mod local_transport;

pub use error::RpcError;
pub use orchestrator_api::{
    ExecutionLogInfo, HelloResponse, PipResultsInfo, ServiceLocation, WorkerCapacities,
};
pub use transport::{OrchestratorRpc, WorkerRpc};
pub use worker_api::{BuildEndData, BuildStartData, EventCount, PerfCounters, WorkerExitResponse};
