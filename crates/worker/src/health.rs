// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker health snapshot (§10's supplemented `WorkerHealth`), giving
//! `pd-cli status` something to print.

use pd_core::{WorkerId, WorkerStatus};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerHealth {
    pub worker_id: WorkerId,
    pub status: WorkerStatus,
    pub ever_available: bool,
    pub last_heartbeat_epoch_ms: Option<u64>,
    pub pending_request_count: usize,
}
