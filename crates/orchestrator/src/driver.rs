// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `RemoteWorkerDriver` (§4.6): the orchestrator's per-worker runtime. Holds
//! the `WorkerRpc` client used to call out to one attached worker (attach
//! retry loop, batched `ExecutePips`, `Exit`) and serves that worker's
//! inbound `OrchestratorInbox` (`Hello`/`AttachCompleted`/`ReportPipResults`/
//! `ReportExecutionLog`) — the orchestrator-side mirror of `pd_worker::Worker`,
//! following the same `Runtime<A, N, C>` generic-over-collaborators shape
//! from `crates/daemon/src/engine/runtime/handlers/worker/lifecycle.rs`.
//!
//! `OnConnectionFailure` (§4.6/§9) is wired through `ConnectionSupervisor`'s
//! single-shot failure callback rather than called out explicitly at each
//! failure site: `new()` registers a callback that drains `completions` the
//! first time `supervisor.fail()` wins its compare-exchange, so a batcher RPC
//! failure and an explicit `disconnect()` both funnel through the same
//! exactly-once path.
//!
//! `ReportExecutionLog` tracks the last sequence number accepted per channel
//! and drops anything that doesn't advance it, tolerating the worker
//! retrying a send whose response it never saw (§3/§8).

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use pd_core::error::DistributionError;
use pd_core::pip::{FileArtifactKeyedHash, LogChannel, PipBuildRequest, PipCompletionData, PipStep, PipStepKey, SinglePipBuildRequest};
use pd_core::{Clock, ConnectionFailureCause, ConnectionSupervisor, InvocationId, WorkerId};
use pd_wire::error::RpcError;
use pd_wire::local_transport::{OrchestratorCall, OrchestratorInbox};
use pd_wire::orchestrator_api::{HelloResponse, WorkerCapacities};
use pd_wire::transport::WorkerRpc;
use pd_wire::worker_api::{BuildEndData, BuildStartData, PerfCounters, WorkerExitResponse};
use tokio::sync::{mpsc, Notify};

use crate::completion::{classify_failure, PipCompletionTable, RetryDecision, RetryableFailure};
use crate::config::OrchestratorConfig;
use crate::stats::EventStatsReconciler;

struct Envelope {
    request: SinglePipBuildRequest,
    hashes: Vec<FileArtifactKeyedHash>,
}

pub struct RemoteWorkerDriver<W: WorkerRpc, C: Clock> {
    worker_id: WorkerId,
    invocation_id: InvocationId,
    session_id: String,
    config: OrchestratorConfig,
    clock: C,
    worker_rpc: Arc<W>,
    supervisor: Arc<ConnectionSupervisor>,
    completions: Arc<PipCompletionTable>,
    stats: EventStatsReconciler,
    available_hashes: DashMap<Vec<u8>, ()>,
    retry_counts: DashMap<PipStepKey, u32>,
    log_sequence: DashMap<LogChannel, i64>,
    outbound: mpsc::Sender<Envelope>,
    batcher_task: Mutex<Option<tokio::task::JoinHandle<()>>>,
    shutdown: Arc<Notify>,
    attached: AtomicBool,
    capacities: Mutex<Option<WorkerCapacities>>,
    last_seen_epoch_ms: AtomicU64,
}

impl<W: WorkerRpc + 'static, C: Clock> RemoteWorkerDriver<W, C> {
    pub fn new(
        worker_id: WorkerId,
        invocation_id: InvocationId,
        session_id: String,
        config: OrchestratorConfig,
        clock: C,
        worker_rpc: Arc<W>,
    ) -> Arc<Self> {
        let (tx, rx) = mpsc::channel(config.max_messages_per_batch.max(1));
        let driver = Arc::new(Self {
            worker_id,
            invocation_id,
            session_id,
            config,
            clock,
            worker_rpc,
            supervisor: Arc::new(ConnectionSupervisor::new()),
            completions: Arc::new(PipCompletionTable::new()),
            stats: EventStatsReconciler::new(),
            available_hashes: DashMap::new(),
            retry_counts: DashMap::new(),
            log_sequence: DashMap::new(),
            outbound: tx,
            batcher_task: Mutex::new(None),
            shutdown: Arc::new(Notify::new()),
            attached: AtomicBool::new(false),
            capacities: Mutex::new(None),
            last_seen_epoch_ms: AtomicU64::new(0),
        });
        let completions_on_failure = driver.completions.clone();
        driver.supervisor.on_failure(move |cause| completions_on_failure.fail_all(cause));

        let task = tokio::spawn(driver.clone().run_batcher(rx));
        *driver.batcher_task.lock() = Some(task);
        driver
    }

    pub fn worker_id(&self) -> WorkerId {
        self.worker_id
    }

    pub fn is_attached(&self) -> bool {
        self.attached.load(Ordering::Acquire)
    }

    pub fn capacities(&self) -> Option<WorkerCapacities> {
        *self.capacities.lock()
    }

    pub fn pending_completions(&self) -> usize {
        self.completions.len()
    }

    /// Epoch millis of the last inbound call this driver processed from its
    /// worker, `0` if none yet. Used for liveness reporting.
    pub fn last_seen_epoch_ms(&self) -> u64 {
        self.last_seen_epoch_ms.load(Ordering::Acquire)
    }

    pub fn supervisor(&self) -> &Arc<ConnectionSupervisor> {
        &self.supervisor
    }

    /// Call `Attach` on the worker, retrying every `attach_retry_interval`
    /// until it succeeds or the invocation id is rejected outright (§4.2).
    pub async fn run_attach_loop(self: &Arc<Self>) -> Result<(), DistributionError> {
        loop {
            let request = BuildStartData {
                invocation_id: self.invocation_id.clone(),
                worker_id: self.worker_id,
                session_id: self.session_id.clone(),
            };
            match self.worker_rpc.attach(request).await {
                Ok(()) => return Ok(()),
                Err(RpcError::InvocationMismatch) => {
                    self.supervisor.fail(ConnectionFailureCause::UnrecoverableFailure);
                    return Err(DistributionError::UnrecoverableFailure("invocation id mismatch on attach".to_string()));
                }
                Err(error) => {
                    tracing::warn!(worker_id = %self.worker_id, %error, "attach call failed, retrying");
                    tokio::time::sleep(self.config.attach_retry_interval).await;
                }
            }
        }
    }

    /// Drive this worker's inbound RPC surface until the transport closes.
    pub async fn serve(self: &Arc<Self>, mut inbox: OrchestratorInbox) -> Result<(), DistributionError> {
        while let Some(call) = inbox.recv().await {
            self.last_seen_epoch_ms.store(self.clock.epoch_ms(), Ordering::Release);
            match call {
                OrchestratorCall::Hello(_location, requested_id, reply) => {
                    let response = self.handle_hello(requested_id);
                    let _ = reply.send(Ok(response));
                }
                OrchestratorCall::AttachCompleted(capacities, _cache_validation_hash, reply) => {
                    // A duplicate after the connection has already failed is
                    // ignored outright rather than resurrecting a dead
                    // driver's attached state.
                    if !self.supervisor.is_failed() {
                        *self.capacities.lock() = Some(capacities);
                        self.attached.store(true, Ordering::Release);
                    }
                    let _ = reply.send(Ok(()));
                }
                OrchestratorCall::ReportPipResults(info, reply) => {
                    self.stats.observe(&info.events);
                    for result in info.results {
                        self.completions.resolve(result);
                    }
                    if let Some(blob) = info.build_manifest_log {
                        self.observe_log_blob(blob.channel, blob.sequence_number);
                    }
                    let _ = reply.send(Ok(()));
                }
                OrchestratorCall::ReportExecutionLog(info, reply) => {
                    self.observe_log_blob(info.blob.channel, info.blob.sequence_number);
                    let _ = reply.send(Ok(()));
                }
            }
        }
        Ok(())
    }

    fn handle_hello(&self, requested_id: Option<WorkerId>) -> HelloResponse {
        if self.supervisor.is_failed() {
            return HelloResponse::Released;
        }
        if let Some(id) = requested_id {
            if id != self.worker_id {
                return HelloResponse::NoSlots;
            }
        }
        HelloResponse::Ok { worker_id: self.worker_id }
    }

    /// Track one channel's strictly-increasing sequence space (§3/§8): a
    /// blob whose sequence number doesn't exceed the last one processed for
    /// its channel is a network-retried duplicate and is silently dropped.
    fn observe_log_blob(&self, channel: LogChannel, sequence_number: i64) {
        let mut is_duplicate = false;
        self.log_sequence
            .entry(channel)
            .and_modify(|last| {
                if sequence_number <= *last {
                    is_duplicate = true;
                } else {
                    *last = sequence_number;
                }
            })
            .or_insert(sequence_number);

        if is_duplicate {
            tracing::debug!(worker_id = %self.worker_id, ?channel, sequence_number, "duplicate execution log sequence number dropped");
        }
    }

    /// Last execution-log sequence number accepted for `channel`, `None` if
    /// none has arrived yet.
    pub fn last_processed_log_sequence(&self, channel: LogChannel) -> Option<i64> {
        self.log_sequence.get(&channel).map(|entry| *entry)
    }

    pub async fn send_heartbeat(&self, counters: PerfCounters) -> Result<(), RpcError> {
        self.worker_rpc.heartbeat(counters).await
    }

    /// Enqueue one pip step for this worker and await its result, unless
    /// it's a fire-and-forget `MaterializeOutputs` request (§4.6), in which
    /// case `Ok(None)` is returned as soon as it's queued.
    pub async fn enqueue_step(
        self: &Arc<Self>,
        request: SinglePipBuildRequest,
        hashes: Vec<FileArtifactKeyedHash>,
    ) -> Result<Option<PipCompletionData>, RetryDecision> {
        let key = request.key();
        let step = request.step;
        let fire_and_forget = step == PipStep::MaterializeOutputs && self.config.fire_forget_materialize_outputs;

        // Unless replication is on, an unattached/unavailable worker is never
        // made to wait on `MaterializeOutputs` (§6.3's
        // `replicateOutputsToWorkers`) — fire-and-forget dispatch still goes
        // out to every worker regardless, since nobody awaits its outcome.
        if step == PipStep::MaterializeOutputs && !fire_and_forget && !self.config.replicate_outputs_to_workers && !self.is_attached() {
            tracing::debug!(worker_id = %self.worker_id, pip_id = %key.pip_id, "skipping unattached worker for non-replicated MaterializeOutputs");
            return Err(RetryDecision::NotMaterialized);
        }

        if fire_and_forget {
            let _ = self.outbound.send(Envelope { request, hashes }).await;
            return Ok(None);
        }

        let receiver = self.completions.register(key);
        if self.outbound.send(Envelope { request, hashes }).await.is_err() {
            self.completions.cancel(&key);
            return Err(self.classify(key));
        }

        // `remote_pip_timeout` (§4.6 Open Question) races the wait against a
        // timer when configured; a timer win cancels the registration and is
        // classified the same as any other retryable remote-worker failure.
        let outcome = match self.config.remote_pip_timeout {
            Some(timeout) => {
                tokio::select! {
                    result = receiver => Some(result),
                    _ = tokio::time::sleep(timeout) => {
                        self.completions.cancel(&key);
                        tracing::warn!(pip_id = %key.pip_id, step = %key.step, ?timeout, "remote pip timeout exceeded");
                        None
                    }
                }
            }
            None => Some(receiver.await),
        };

        match outcome {
            Some(Ok(Ok(data))) => {
                self.retry_counts.remove(&key);
                Ok(Some(data))
            }
            Some(Ok(Err(RetryableFailure(_)))) | Some(Err(_)) | None => Err(self.classify(key)),
        }
    }

    fn classify(&self, key: PipStepKey) -> RetryDecision {
        let mut entry = self.retry_counts.entry(key).or_insert(0);
        *entry += 1;
        classify_failure(key.step, *entry, self.config.max_retry_limit_on_remote_workers)
    }

    async fn run_batcher(self: Arc<Self>, mut rx: mpsc::Receiver<Envelope>) {
        loop {
            let first = tokio::select! {
                item = rx.recv() => item,
                _ = self.shutdown.notified() => None,
            };
            let Some(first) = first else {
                break;
            };

            let mut pips = vec![first.request];
            let mut hashes = first.hashes;
            while pips.len() < self.config.max_messages_per_batch {
                match tokio::time::timeout(self.config.batch_idle_timeout, rx.recv()).await {
                    Ok(Some(envelope)) => {
                        pips.push(envelope.request);
                        hashes.extend(envelope.hashes);
                    }
                    _ => break,
                }
            }

            // Source-affected hashes are omitted from the wire entirely when
            // distributed source hashing is enabled (§6.3) — the worker is
            // assumed to already have them locally, the same assumption
            // `InputReporter::with_distributed_source_hashing` makes on the
            // receiving end.
            let fresh_hashes: Vec<_> = hashes
                .into_iter()
                .filter(|hash| !(self.config.enable_distributed_source_hashing && hash.is_source_affected))
                .filter(|hash| self.available_hashes.insert(hash.hash.clone(), ()).is_none())
                .collect();
            let batch = PipBuildRequest { pips, hashes: fresh_hashes };
            if let Err(error) = self.worker_rpc.execute_pips(batch).await {
                tracing::warn!(worker_id = %self.worker_id, %error, "execute_pips failed, resetting available-hash cache");
                self.available_hashes.clear();
                self.supervisor.fail(ConnectionFailureCause::CallDeadlineExceeded);
            }
        }
    }

    /// Tear the connection down: fail every pending completion (via the
    /// `ConnectionSupervisor`'s single-shot failure callback, registered in
    /// `new()`), stop the batcher, and issue `Exit`. Reentrant: a second call
    /// after the batcher has already joined just issues another `Exit` (the
    /// worker side is itself idempotent here, per §5).
    pub async fn disconnect(self: &Arc<Self>, cause: ConnectionFailureCause, failure: Option<String>) -> WorkerExitResponse {
        self.supervisor.fail(cause);
        self.shutdown.notify_waiters();

        if let Some(task) = self.batcher_task.lock().take() {
            let _ = task.await;
        }

        match self.worker_rpc.exit(BuildEndData { failure }).await {
            Ok(response) => {
                self.stats.reconcile(&response);
                response
            }
            Err(error) => {
                tracing::warn!(worker_id = %self.worker_id, %error, "exit call failed during disconnect");
                WorkerExitResponse::default()
            }
        }
    }
}

#[cfg(test)]
#[path = "driver_tests.rs"]
mod tests;
