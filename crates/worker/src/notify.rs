// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Background batching engine for pip results and forwarded events (§4.4).
//!
//! A single sender task merges pip results and loose forwarded events into
//! batched `ReportPipResults` calls. Events that name a specific pip are
//! staged synchronously into that pip's private queue the moment they're
//! reported — not routed through the async channel — so there is no race
//! between an event and the result it must precede: by the time a result
//! for a pip reaches the background task, every event already reported for
//! that pip is already sitting in its queue, regardless of scheduling order.
//! Events with no pip association go straight into the next outgoing batch.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use pd_core::pip::{EventMessage, PipCompletionData, PipId};
use pd_core::{InvocationId, WorkerId};
use pd_wire::orchestrator_api::PipResultsInfo;
use pd_wire::transport::OrchestratorRpc;
use pd_wire::worker_api::EventCount;
use tokio::sync::mpsc;

use crate::exec_log::ExecutionLogStream;

pub(crate) const DEFAULT_IDLE_POLL: Duration = Duration::from_secs(120);
const DEFAULT_MAX_MESSAGES_PER_BATCH: usize = 64;

enum NotificationItem {
    Result(PipCompletionData),
    LooseEvent(EventMessage),
}

/// Handle used by producers (`RequestIntake`, the scheduler's event hooks)
/// to feed the background sender. Cloning is cheap.
pub struct NotificationHandle<O: OrchestratorRpc> {
    manager: Arc<NotificationManager<O>>,
    items: mpsc::UnboundedSender<NotificationItem>,
}

impl<O: OrchestratorRpc> Clone for NotificationHandle<O> {
    fn clone(&self) -> Self {
        Self { manager: self.manager.clone(), items: self.items.clone() }
    }
}

impl<O: OrchestratorRpc> NotificationHandle<O> {
    /// Per-`eventId` tally of events accepted for forwarding so far,
    /// snapshotted into `WorkerExitResponse.event_counts` at `Exit`.
    pub fn event_counts(&self) -> Vec<EventCount> {
        self.manager.event_counts()
    }

    pub fn report_result(&self, result: PipCompletionData) {
        // A closed receiver means the sender loop already shut down (the
        // worker is exiting); dropping the result here is correct, not lost
        // work, since the build has already ended.
        let _ = self.items.send(NotificationItem::Result(result));
    }

    pub fn report_event(&self, event: EventMessage) {
        self.manager
            .event_counts
            .entry(event.event_id)
            .or_insert_with(|| AtomicU32::new(0))
            .fetch_add(1, Ordering::AcqRel);
        match event.extract_pip_hash() {
            Some(hash) => {
                // The semi-stable hash and the pip id occupy the same
                // numeric space in this runtime's simplified model; a real
                // deployment would resolve it through the pip graph instead.
                self.manager.pending_events.entry(PipId::new(hash as u32)).or_default().push(event);
            }
            None => {
                let _ = self.items.send(NotificationItem::LooseEvent(event));
            }
        }
    }
}

pub struct NotificationManager<O: OrchestratorRpc> {
    orchestrator: Arc<O>,
    invocation_id: InvocationId,
    worker_id: WorkerId,
    max_messages_per_batch: usize,
    idle_poll: Duration,
    pending_events: DashMap<PipId, Vec<EventMessage>>,
    batch_sequence: AtomicU64,
    event_counts: DashMap<u32, AtomicU32>,
    manifest_log: Option<Arc<ExecutionLogStream<O>>>,
}

impl<O: OrchestratorRpc> NotificationManager<O> {
    pub fn new(orchestrator: Arc<O>, invocation_id: InvocationId, worker_id: WorkerId) -> Arc<Self> {
        Self::with_tuning(orchestrator, invocation_id, worker_id, DEFAULT_MAX_MESSAGES_PER_BATCH, DEFAULT_IDLE_POLL)
    }

    pub fn with_tuning(
        orchestrator: Arc<O>,
        invocation_id: InvocationId,
        worker_id: WorkerId,
        max_messages_per_batch: usize,
        idle_poll: Duration,
    ) -> Arc<Self> {
        Self::with_manifest_log(orchestrator, invocation_id, worker_id, max_messages_per_batch, idle_poll, None)
    }

    /// `manifest_log`, when given, is pulled for a forced flush every cycle
    /// and packaged alongside the batch (§4.4's third merged stream) instead
    /// of sending itself over `ReportExecutionLog` independently.
    pub fn with_manifest_log(
        orchestrator: Arc<O>,
        invocation_id: InvocationId,
        worker_id: WorkerId,
        max_messages_per_batch: usize,
        idle_poll: Duration,
        manifest_log: Option<Arc<ExecutionLogStream<O>>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            orchestrator,
            invocation_id,
            worker_id,
            max_messages_per_batch,
            idle_poll,
            pending_events: DashMap::new(),
            batch_sequence: AtomicU64::new(0),
            event_counts: DashMap::new(),
            manifest_log,
        })
    }

    /// Per-`eventId` tally of every event this manager has accepted for
    /// forwarding, reported at `Exit` (§4.7) so the orchestrator's
    /// reconciliation has something real to compare against.
    pub fn event_counts(&self) -> Vec<EventCount> {
        self.event_counts
            .iter()
            .map(|entry| EventCount { event_id: *entry.key(), count: entry.value().load(Ordering::Acquire) })
            .collect()
    }

    /// Spawn the background sender task and return a handle producers use
    /// to feed it plus the task's join handle (awaited during `Exit`).
    pub fn spawn(self: &Arc<Self>) -> (NotificationHandle<O>, tokio::task::JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = NotificationHandle { manager: self.clone(), items: tx };
        let task = tokio::spawn(self.clone().run(rx));
        (handle, task)
    }

    async fn run(self: Arc<Self>, mut items: mpsc::UnboundedReceiver<NotificationItem>) {
        let mut batch_results = Vec::new();
        let mut batch_events = Vec::new();
        let mut idle = tokio::time::interval(self.idle_poll);
        idle.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                maybe = items.recv() => {
                    match maybe {
                        Some(item) => self.stage(item, &mut batch_results, &mut batch_events),
                        None => break,
                    }
                }
                _ = idle.tick() => {}
            }

            // Opportunistic drain: pick up anything else already queued
            // without blocking, up to the batch cap, before sending.
            while batch_results.len() + batch_events.len() < self.max_messages_per_batch {
                match items.try_recv() {
                    Ok(item) => self.stage(item, &mut batch_results, &mut batch_events),
                    Err(_) => break,
                }
            }

            let manifest_blob = self.pull_manifest_log().await;
            if !batch_results.is_empty() || !batch_events.is_empty() || manifest_blob.is_some() {
                self.flush(&mut batch_results, &mut batch_events, manifest_blob).await;
            }
        }

        let manifest_blob = self.pull_manifest_log().await;
        self.flush(&mut batch_results, &mut batch_events, manifest_blob).await;
        self.log_orphan_events();
    }

    /// Force a flush of the manifest execution-log stream, if one is wired,
    /// so its bytes ride along in this cycle's batch rather than going out
    /// over `ReportExecutionLog` on its own byte threshold (§4.4/§4.5).
    async fn pull_manifest_log(&self) -> Option<pd_core::pip::ExecutionLogBlob> {
        self.manifest_log.as_ref()?.take_for_batch().await
    }

    fn stage(&self, item: NotificationItem, batch_results: &mut Vec<PipCompletionData>, batch_events: &mut Vec<EventMessage>) {
        match item {
            NotificationItem::Result(result) => {
                if let Some((_, queued)) = self.pending_events.remove(&result.pip_id) {
                    batch_events.extend(queued);
                }
                batch_results.push(result);
            }
            NotificationItem::LooseEvent(event) => batch_events.push(event),
        }
    }

    async fn flush(
        &self,
        batch_results: &mut Vec<PipCompletionData>,
        batch_events: &mut Vec<EventMessage>,
        manifest_log: Option<pd_core::pip::ExecutionLogBlob>,
    ) {
        if batch_results.is_empty() && batch_events.is_empty() && manifest_log.is_none() {
            return;
        }
        let sequence = self.batch_sequence.fetch_add(1, Ordering::AcqRel);
        let info = PipResultsInfo {
            invocation_id: self.invocation_id.clone(),
            worker_id: self.worker_id,
            batch_sequence_number: sequence,
            results: std::mem::take(batch_results),
            events: std::mem::take(batch_events),
            build_manifest_log: manifest_log,
        };
        if let Err(error) = self.orchestrator.report_pip_results(info).await {
            tracing::warn!(worker_id = %self.worker_id, %error, "failed to report pip results batch");
        }
    }

    /// Events still queued against a pip when the stream closes never got a
    /// matching result to ride in ahead of; log them rather than silently
    /// dropping them (§4.4's "tail flush ... orphan events logged").
    fn log_orphan_events(&self) {
        for entry in self.pending_events.iter() {
            for event in entry.value() {
                tracing::warn!(pip_id = %entry.key(), event_id = event.event_id, "orphan event dropped at stream close");
            }
        }
        self.pending_events.clear();
    }
}

#[cfg(test)]
#[path = "notify_tests.rs"]
mod tests;
