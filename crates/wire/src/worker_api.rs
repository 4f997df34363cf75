// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! DTOs for the worker-side RPC surface (§6.1): `Attach`, `ExecutePips`,
//! `Exit`, `Heartbeat`. Request bodies for `ExecutePips` reuse
//! `pd_core::pip::PipBuildRequest` directly rather than duplicating it —
//! there is no separate "on the wire" shape, matching how the teacher's
//! `oj-wire` crate re-exports `oj-core` types into its `Request` variants
//! instead of mirroring them.

use pd_core::{InvocationId, WorkerId};
use serde::{Deserialize, Serialize};

/// `Attach` request body: tells the worker which build it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildStartData {
    pub invocation_id: InvocationId,
    pub worker_id: WorkerId,
    pub session_id: String,
}

/// `Exit` request body. `failure` is `Some` when the orchestrator is tearing
/// the worker down because of a build-wide failure rather than completion.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BuildEndData {
    pub failure: Option<String>,
}

/// Per-`eventId` count, used for the event-stats reconciliation in §4.7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventCount {
    pub event_id: u32,
    pub count: u32,
}

/// `Exit` response body.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WorkerExitResponse {
    pub event_counts: Vec<EventCount>,
}

/// `Heartbeat` request body. Received but not enforced (§9) — the worker
/// records it for health reporting and never fails a build over a missed one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerfCounters {
    pub cpu_percent: f32,
    pub ram_mb: u32,
}
