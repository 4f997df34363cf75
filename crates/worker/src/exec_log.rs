// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Backpressured in-memory buffer feeding sequenced execution-log blobs
//! (§4.5). One stream per channel (general, build-manifest); each keeps its
//! own strictly-increasing sequence space.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use pd_core::pip::{ExecutionLogBlob, LogChannel};
use pd_core::{InvocationId, WorkerId};
use pd_wire::orchestrator_api::ExecutionLogInfo;
use pd_wire::transport::OrchestratorRpc;

const DEFAULT_BYTE_THRESHOLD: usize = 1024 * 1024;

pub struct ExecutionLogStream<O: OrchestratorRpc> {
    orchestrator: Arc<O>,
    invocation_id: InvocationId,
    worker_id: WorkerId,
    channel: LogChannel,
    buffer: Mutex<Vec<u8>>,
    next_sequence: AtomicI64,
    byte_threshold: usize,
    active: AtomicBool,
    /// Whether crossing `byte_threshold` sends over `ReportExecutionLog`
    /// directly. The general channel does; the build-manifest channel
    /// instead only ever leaves via the notification cycle's forced pull
    /// (`take_for_batch`), so its threshold is purely a later safety net if
    /// the cycle falls behind (see `Worker::new`'s wiring).
    direct_flush: bool,
}

impl<O: OrchestratorRpc> ExecutionLogStream<O> {
    pub fn new(orchestrator: Arc<O>, invocation_id: InvocationId, worker_id: WorkerId, channel: LogChannel) -> Self {
        Self::new_internal(orchestrator, invocation_id, worker_id, channel, DEFAULT_BYTE_THRESHOLD, true)
    }

    /// Like `new`, but never sends on its own: only `take_for_batch` moves
    /// bytes out, for a stream whose delivery rides piggybacked inside
    /// another RPC rather than its own (§4.4's manifest-log stream).
    pub fn new_batched(orchestrator: Arc<O>, invocation_id: InvocationId, worker_id: WorkerId, channel: LogChannel) -> Self {
        Self::new_internal(orchestrator, invocation_id, worker_id, channel, DEFAULT_BYTE_THRESHOLD, false)
    }

    pub fn with_byte_threshold(
        orchestrator: Arc<O>,
        invocation_id: InvocationId,
        worker_id: WorkerId,
        channel: LogChannel,
        byte_threshold: usize,
    ) -> Self {
        Self::new_internal(orchestrator, invocation_id, worker_id, channel, byte_threshold, true)
    }

    fn new_internal(
        orchestrator: Arc<O>,
        invocation_id: InvocationId,
        worker_id: WorkerId,
        channel: LogChannel,
        byte_threshold: usize,
        direct_flush: bool,
    ) -> Self {
        Self {
            orchestrator,
            invocation_id,
            worker_id,
            channel,
            buffer: Mutex::new(Vec::new()),
            next_sequence: AtomicI64::new(0),
            byte_threshold,
            active: AtomicBool::new(true),
            direct_flush,
        }
    }

    /// `true` once a send has failed; further writes become no-ops.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Append bytes to the buffer, flushing once the byte threshold is
    /// crossed and this stream sends directly. A deactivated stream
    /// silently drops writes.
    pub async fn write(&self, bytes: &[u8]) {
        if !self.is_active() {
            return;
        }
        let should_flush = {
            let mut buffer = self.buffer.lock();
            buffer.extend_from_slice(bytes);
            self.direct_flush && buffer.len() >= self.byte_threshold
        };
        if should_flush {
            self.flush().await;
        }
    }

    /// Flush whatever is buffered, e.g. on the notification cycle's
    /// opportunistic pull. No-op if the buffer is empty or the stream has
    /// deactivated.
    pub async fn flush(&self) {
        if !self.is_active() {
            return;
        }
        let data = {
            let mut buffer = self.buffer.lock();
            if buffer.is_empty() {
                return;
            }
            std::mem::take(&mut *buffer)
        };

        let sequence_number = self.next_sequence.fetch_add(1, Ordering::AcqRel);
        let info = ExecutionLogInfo {
            invocation_id: self.invocation_id.clone(),
            worker_id: self.worker_id,
            blob: ExecutionLogBlob { channel: self.channel, data, sequence_number },
        };

        if let Err(error) = self.orchestrator.report_execution_log(info).await {
            tracing::warn!(worker_id = %self.worker_id, channel = ?self.channel, %error, "execution log send failed, deactivating stream");
            self.active.store(false, Ordering::Release);
        }
    }

    /// Force a flush of whatever is buffered, bypassing the byte threshold,
    /// and return the blob instead of sending it over `ReportExecutionLog`
    /// (§4.4/§4.5's "notification-cycle pull"). `None` if inactive or empty.
    pub async fn take_for_batch(&self) -> Option<ExecutionLogBlob> {
        if !self.is_active() {
            return None;
        }
        let data = {
            let mut buffer = self.buffer.lock();
            if buffer.is_empty() {
                return None;
            }
            std::mem::take(&mut *buffer)
        };
        let sequence_number = self.next_sequence.fetch_add(1, Ordering::AcqRel);
        Some(ExecutionLogBlob { channel: self.channel, data, sequence_number })
    }
}

#[cfg(test)]
#[path = "exec_log_tests.rs"]
mod tests;
