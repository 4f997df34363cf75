// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker-side attach handshake and RPC dispatch loop (§4.1/§4.2), wiring
//! `LifecycleSm`, `ConnectionSupervisor`, `RequestIntake`, `InputReporter`,
//! `NotificationManager` and the two `ExecutionLogStream`s together behind
//! one `Worker` handle — the worker-side analogue of the teacher's
//! `Runtime<A, N, C>` generic-over-collaborators pattern
//! (`crates/daemon/src/engine/runtime/handlers/worker/lifecycle.rs`), here
//! generic over `PipScheduler`, `FileContentManager`, `OrchestratorRpc`, and
//! `Clock`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use pd_core::error::DistributionError;
use pd_core::pip::PipBuildRequest;
use pd_core::{Clock, ConnectionFailureCause, ConnectionSupervisor, InvocationId, LifecycleSm, WorkerId, WorkerStatus};
use pd_wire::error::RpcError;
use pd_wire::local_transport::{WorkerCall, WorkerInbox};
use pd_wire::orchestrator_api::{HelloResponse, ServiceLocation, WorkerCapacities};
use pd_wire::transport::OrchestratorRpc;
use pd_wire::worker_api::WorkerExitResponse;

use crate::config::WorkerConfig;
use crate::exec_log::ExecutionLogStream;
use crate::health::WorkerHealth;
use crate::intake::{InputReporter, RequestIntake};
use crate::notify::{NotificationHandle, NotificationManager};
use crate::scheduler::{FileContentManager, PipScheduler};

/// A worker process's distribution runtime: everything needed to answer the
/// worker-side RPC surface (§6.1) for one attached build.
pub struct Worker<S: PipScheduler, F: FileContentManager, O: OrchestratorRpc, C: Clock> {
    worker_id: WorkerId,
    invocation_id: InvocationId,
    config: WorkerConfig,
    clock: C,
    status: Arc<LifecycleSm>,
    supervisor: Arc<ConnectionSupervisor>,
    orchestrator: Arc<O>,
    intake: RequestIntake<S, O>,
    input_reporter: InputReporter<F>,
    notifications: NotificationHandle<O>,
    notify_task: Mutex<Option<tokio::task::JoinHandle<()>>>,
    general_log: Arc<ExecutionLogStream<O>>,
    manifest_log: Arc<ExecutionLogStream<O>>,
    last_heartbeat_epoch_ms: AtomicU64,
    exit_response: Mutex<Option<WorkerExitResponse>>,
}

impl<S: PipScheduler, F: FileContentManager, O: OrchestratorRpc, C: Clock> Worker<S, F, O, C> {
    pub fn new(
        worker_id: WorkerId,
        invocation_id: InvocationId,
        config: WorkerConfig,
        clock: C,
        scheduler: Arc<S>,
        content_manager: Arc<F>,
        orchestrator: Arc<O>,
    ) -> Arc<Self> {
        let general_log = Arc::new(ExecutionLogStream::new(
            orchestrator.clone(),
            invocation_id.clone(),
            worker_id,
            pd_core::pip::LogChannel::General,
        ));
        let manifest_log = Arc::new(ExecutionLogStream::new_batched(
            orchestrator.clone(),
            invocation_id.clone(),
            worker_id,
            pd_core::pip::LogChannel::BuildManifest,
        ));
        let notification_manager = NotificationManager::with_manifest_log(
            orchestrator.clone(),
            invocation_id.clone(),
            worker_id,
            config.max_messages_per_batch,
            crate::notify::DEFAULT_IDLE_POLL,
            Some(manifest_log.clone()),
        );
        let (notifications, notify_task) = notification_manager.spawn();
        let intake = RequestIntake::new(scheduler, notifications.clone());
        let input_reporter = InputReporter::with_distributed_source_hashing(content_manager, config.enable_distributed_source_hashing);

        Arc::new(Self {
            worker_id,
            invocation_id,
            config,
            clock,
            status: Arc::new(LifecycleSm::new()),
            supervisor: Arc::new(ConnectionSupervisor::new()),
            orchestrator,
            intake,
            input_reporter,
            notifications,
            notify_task: Mutex::new(Some(notify_task)),
            general_log,
            manifest_log,
            last_heartbeat_epoch_ms: AtomicU64::new(0),
            exit_response: Mutex::new(None),
        })
    }

    pub fn status(&self) -> WorkerStatus {
        self.status.status()
    }

    pub fn health(&self) -> WorkerHealth {
        WorkerHealth {
            worker_id: self.worker_id,
            status: self.status(),
            ever_available: self.status.ever_available(),
            last_heartbeat_epoch_ms: match self.last_heartbeat_epoch_ms.load(Ordering::Acquire) {
                0 => None,
                ms => Some(ms),
            },
            pending_request_count: self.intake.pending_count(),
        }
    }

    /// Say `Hello` to the orchestrator, then drain the transport's inbox
    /// until it closes or `Exit` is handled. Hello and the first `Attach`
    /// share one `worker_attach_timeout` budget (§4.2 phase 1); any other
    /// delay is unbounded (other deadlines are per-call and enforced by the
    /// caller's transport, out of scope here).
    pub async fn serve(self: &Arc<Self>, mut inbox: WorkerInbox) -> Result<(), DistributionError> {
        if !self.say_hello().await? {
            self.status.try_transition(WorkerStatus::Stopped);
            return Ok(());
        }

        match tokio::time::timeout(self.config.worker_attach_timeout, inbox.recv()).await {
            Ok(Some(call)) => self.dispatch(call).await?,
            Ok(None) => return Err(DistributionError::UnrecoverableFailure("transport closed before attach".to_string())),
            Err(_) => {
                self.supervisor.fail(ConnectionFailureCause::AttachmentTimeout);
                return Err(DistributionError::AttachmentTimeout(format!(
                    "no Attach within {:?}",
                    self.config.worker_attach_timeout
                )));
            }
        }

        while let Some(call) = inbox.recv().await {
            if self.status().is_terminal() {
                // Still reply to whatever arrived after Stopped (Exit is
                // reentrant) rather than silently swallowing the reply
                // channel and hanging the caller.
                self.dispatch(call).await?;
                continue;
            }
            self.dispatch(call).await?;
        }

        Ok(())
    }

    /// `Ok(true)` once the orchestrator has accepted this worker and it
    /// should proceed to wait for `Attach`; `Ok(false)` on a graceful
    /// `Released`/`NoSlots` early exit (§7 — not a failure).
    async fn say_hello(self: &Arc<Self>) -> Result<bool, DistributionError> {
        let location = ServiceLocation { host: self.config.advertised_host.clone(), port: self.config.build_service_port };
        let hello = tokio::time::timeout(self.config.worker_attach_timeout, self.orchestrator.hello(location, Some(self.worker_id))).await;

        match hello {
            Ok(Ok(HelloResponse::Ok { .. })) => Ok(true),
            Ok(Ok(HelloResponse::Released)) => {
                tracing::info!(worker_id = %self.worker_id, "released at hello, exiting");
                Ok(false)
            }
            Ok(Ok(HelloResponse::NoSlots)) => {
                tracing::info!(worker_id = %self.worker_id, "no slots available at hello, exiting");
                Ok(false)
            }
            Ok(Err(error)) => Err(DistributionError::UnrecoverableFailure(format!("hello call failed: {error}"))),
            Err(_) => {
                self.supervisor.fail(ConnectionFailureCause::AttachmentTimeout);
                Err(DistributionError::AttachmentTimeout("timed out saying hello".to_string()))
            }
        }
    }

    async fn dispatch(self: &Arc<Self>, call: WorkerCall) -> Result<(), DistributionError> {
        match call {
            WorkerCall::Attach(request, reply) => {
                if request.invocation_id != self.invocation_id {
                    self.status.try_transition(WorkerStatus::Stopped);
                    let _ = reply.send(Err(RpcError::InvocationMismatch));
                    return Err(DistributionError::UnrecoverableFailure("invocation id mismatch on Attach".to_string()));
                }
                self.status.try_transition(WorkerStatus::Starting);
                self.status.try_transition(WorkerStatus::Started);
                let _ = reply.send(Ok(()));

                let capacities = WorkerCapacities {
                    total_process_slots: 1,
                    available_process_slots: 1,
                    total_ipc_slots: 1,
                    available_ipc_slots: 1,
                };
                let orchestrator = self.orchestrator.clone();
                let worker_id = self.worker_id;
                tokio::spawn(async move {
                    if let Err(error) = orchestrator.attach_completed(capacities, Vec::new()).await {
                        tracing::warn!(%worker_id, %error, "attach_completed call failed");
                    }
                });
            }
            WorkerCall::ExecutePips(request, reply) => {
                self.status.try_transition(WorkerStatus::Running);
                self.handle_execute_pips(request).await;
                let _ = reply.send(Ok(()));
            }
            WorkerCall::Exit(data, reply) => {
                let response = self.handle_exit(data).await;
                let _ = reply.send(Ok(response));
            }
            WorkerCall::Heartbeat(counters, reply) => {
                self.last_heartbeat_epoch_ms.store(self.clock.epoch_ms(), Ordering::Release);
                tracing::debug!(worker_id = %self.worker_id, cpu = counters.cpu_percent, ram_mb = counters.ram_mb, "heartbeat received");
                let _ = reply.send(Ok(()));
            }
        }
        Ok(())
    }

    async fn handle_execute_pips(&self, request: PipBuildRequest) {
        let failed_hashes = self.input_reporter.report(&request.hashes).await;

        if failed_hashes > 0 {
            let error = DistributionError::VerifySourceFilesFailed(failed_hashes);
            for pip in request.pips {
                tracing::warn!(pip_id = %pip.pip_id, step = %pip.step, %error, "failing pip, source file verification failed");
                self.notifications.report_event(pd_core::pip::EventMessage {
                    event_id: 0,
                    level: pd_core::pip::EventLevel::Error,
                    text: error.to_string(),
                    pip_semi_stable_hash: Some(pip.pip_id.value() as u64),
                });
                self.notifications.report_result(pd_core::pip::PipCompletionData {
                    pip_id: pip.pip_id,
                    step: pip.step,
                    result_blob: Vec::new(),
                    execute_step_ticks: 0,
                    queue_ticks: 0,
                    thread_id: 0,
                    start_time_ticks: 0,
                    before_send_ticks: 0,
                });
            }
            return;
        }

        self.intake.admit_batch(PipBuildRequest { pips: request.pips, hashes: Vec::new() }).await;
    }

    async fn handle_exit(self: &Arc<Self>, _data: pd_wire::worker_api::BuildEndData) -> WorkerExitResponse {
        if let Some(cached) = self.exit_response.lock().clone() {
            return cached;
        }

        self.status.try_transition(WorkerStatus::Stopping);
        self.status.try_transition(WorkerStatus::Stopped);

        self.general_log.flush().await;
        self.manifest_log.flush().await;

        let task = self.notify_task.lock().take();
        if let Some(task) = task {
            drop(self.notifications.clone());
            let _ = task.await;
        }

        let response = WorkerExitResponse { event_counts: self.notifications.event_counts() };
        *self.exit_response.lock() = Some(response.clone());
        response
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
