// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Idempotent admission of pip-step requests (§4.3).
//!
//! Each `SinglePipBuildRequest` is admitted at most once per `sequenceNumber`
//! (a CAS into a concurrent set), recorded under its `(pipId, step)` key in a
//! concurrent pending table, and handed to the scheduler. The pending table
//! and the handled-sequence set are `DashMap`s rather than a mutex-guarded
//! `HashMap` — RPC handler tasks admit concurrently and must not serialize
//! behind one lock (§5), which is also why this crate pulls in `dashmap`
//! over the teacher's usual `parking_lot::Mutex<HashMap<_>>`.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use pd_core::error::DistributionError;
use pd_core::pip::{
    FileArtifactKeyedHash, PipBuildRequest, PipId, PipStep, PipStepKey, PipType,
    SinglePipBuildRequest,
};
use pd_wire::transport::OrchestratorRpc;

use crate::notify::NotificationHandle;
use crate::scheduler::{ExecutionOutcome, FileContentManager, PipScheduler, StepObserver};

struct PendingEntry {
    activity_id: String,
}

/// Admits pip-step requests, dedupes by sequence number, and forwards
/// admitted work to the scheduler.
pub struct RequestIntake<S: PipScheduler, O: OrchestratorRpc> {
    scheduler: Arc<S>,
    notifications: NotificationHandle<O>,
    handled_sequences: DashMap<u64, ()>,
    pending: Arc<DashMap<PipStepKey, PendingEntry>>,
}

impl<S: PipScheduler, O: OrchestratorRpc> RequestIntake<S, O> {
    pub fn new(scheduler: Arc<S>, notifications: NotificationHandle<O>) -> Self {
        Self {
            scheduler,
            notifications,
            handled_sequences: DashMap::new(),
            pending: Arc::new(DashMap::new()),
        }
    }

    /// Number of requests currently occupying a pending-table slot.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub async fn admit(&self, request: SinglePipBuildRequest) -> Result<(), DistributionError> {
        if self.handled_sequences.insert(request.sequence_number, ()).is_some() {
            tracing::debug!(sequence_number = request.sequence_number, "duplicate sequence number, ignoring retry");
            return Ok(());
        }

        if request.step != PipStep::MaterializeOutputs
            && !matches!(request.pip_type, PipType::Process | PipType::Ipc)
        {
            return Err(DistributionError::UnrecoverableFailure(format!(
                "pip {} step {} requires pipType Process or IPC, got {:?}",
                request.pip_id, request.step, request.pip_type
            )));
        }

        let key = request.key();
        self.pending.insert(key, PendingEntry { activity_id: request.activity_id.clone() });

        let observer = Arc::new(IntakeObserver {
            pending: self.pending.clone(),
            notifications: self.notifications.clone(),
            key,
        });
        self.scheduler.start_pip_step(request.pip_id, request.step, request.priority, observer).await;
        Ok(())
    }

    /// Admit every request in a batch, skipping ones the scheduler hard-rejects.
    pub async fn admit_batch(&self, batch: PipBuildRequest) {
        for request in batch.pips {
            if let Err(error) = self.admit(request).await {
                tracing::error!(%error, "pip step rejected at admission");
            }
        }
    }
}

struct IntakeObserver<O: OrchestratorRpc> {
    pending: Arc<DashMap<PipStepKey, PendingEntry>>,
    notifications: NotificationHandle<O>,
    key: PipStepKey,
}

impl<O: OrchestratorRpc> StepObserver for IntakeObserver<O> {
    fn on_end(&self, outcome: ExecutionOutcome) {
        match outcome {
            ExecutionOutcome::Completed(data) => {
                if data.step != self.key.step {
                    tracing::warn!(pip_id = %data.pip_id, expected = %self.key.step, actual = %data.step, "step mismatch in completion, treating as duplicate");
                    return;
                }
                self.pending.remove(&self.key);
                self.notifications.report_result(data);
            }
            ExecutionOutcome::Failed { pip_id, step, message } => {
                if step != self.key.step {
                    tracing::warn!(%pip_id, expected = %self.key.step, actual = %step, "step mismatch in failure, treating as duplicate");
                    return;
                }
                self.pending.remove(&self.key);
                self.notifications.report_event(pd_core::pip::EventMessage {
                    event_id: 0,
                    level: pd_core::pip::EventLevel::Error,
                    text: message,
                    pip_semi_stable_hash: Some(pip_id.value() as u64),
                });
                self.notifications.report_result(pd_core::pip::PipCompletionData {
                    pip_id,
                    step,
                    result_blob: Vec::new(),
                    execute_step_ticks: 0,
                    queue_ticks: 0,
                    thread_id: 0,
                    start_time_ticks: 0,
                    before_send_ticks: 0,
                });
            }
        }
    }
}

/// Translates hash/path/directory descriptors into scheduler file-content
/// facts (§4.3/§6.4). Failures accumulate into a count the caller turns into
/// `VerifySourceFilesFailed` for affected pips; a file-content rejection
/// never fails the worker itself.
pub struct InputReporter<F: FileContentManager> {
    content_manager: Arc<F>,
    skip_source_hashes: bool,
}

impl<F: FileContentManager> InputReporter<F> {
    pub fn new(content_manager: Arc<F>) -> Self {
        Self::with_distributed_source_hashing(content_manager, false)
    }

    /// `skip_source_hashes` mirrors `enableDistributedSourceHashing` (§6.3):
    /// source-affected hashes are assumed available and never verified, the
    /// same assumption the orchestrator makes when it omits them from the
    /// wire in the first place.
    pub fn with_distributed_source_hashing(content_manager: Arc<F>, skip_source_hashes: bool) -> Self {
        Self { content_manager, skip_source_hashes }
    }

    /// Report every hash in the batch, grouping dynamic-directory members
    /// together before a single `report_dynamic_directory_contents` call per
    /// directory. Returns the number of hashes that failed verification.
    pub async fn report(&self, hashes: &[FileArtifactKeyedHash]) -> usize {
        let mut failures = 0usize;
        let mut by_directory: HashMap<u32, (pd_core::pip::SealedDirectoryRef, Vec<FileArtifactKeyedHash>)> = HashMap::new();

        for hash in hashes {
            if self.skip_source_hashes && hash.is_source_affected {
                continue;
            }
            let accepted = self.content_manager.report_worker_pip_input_content(hash).await;
            if !accepted {
                failures += 1;
            }
            for directory in &hash.associated_directories {
                by_directory
                    .entry(directory.seal_id)
                    .or_insert_with(|| (directory.clone(), Vec::new()))
                    .1
                    .push(hash.clone());
            }
        }

        for (directory, files) in by_directory.into_values() {
            // Not attributed to a specific pip in this simplified model; the
            // scheduler only needs to know the directory's final membership.
            self.content_manager.report_dynamic_directory_contents(&directory, &files, PipId::new(0)).await;
        }

        failures
    }
}

#[cfg(test)]
#[path = "intake_tests.rs"]
mod tests;
