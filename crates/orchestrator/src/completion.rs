// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pip-completion future table and retry classification (§4.6).
//!
//! One oneshot channel per in-flight `(pipId, step)`, kept in a `DashMap` so
//! `ReportPipResults` handling (one task per worker connection) never
//! contends with `enqueue_step` callers registering new futures. A result
//! that doesn't match any registered key — because it already completed, or
//! because it's a late arrival for a key this driver stopped tracking — is
//! dropped as a stale retry rather than treated as an error.

use dashmap::DashMap;
use pd_core::pip::{PipCompletionData, PipStep, PipStepKey};
use pd_core::ConnectionFailureCause;
use tokio::sync::oneshot;

/// A step failed to produce a result because the connection to its worker
/// was lost; the caller decides whether/how to retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryableFailure(pub ConnectionFailureCause);

/// What a failed or abandoned step should become, per §4.6's retry table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// `MaterializeOutputs` never fails the build outright.
    NotMaterialized,
    /// Retryable: below the configured retry limit.
    RemoteWorkerFailure,
    /// Retries exhausted: terminal for this pip.
    DistributionFailure,
}

/// Classify a step failure into a retry decision (§4.6/§7).
pub fn classify_failure(step: PipStep, retry_count: u32, max_retry_limit: u32) -> RetryDecision {
    if step == PipStep::MaterializeOutputs {
        RetryDecision::NotMaterialized
    } else if retry_count < max_retry_limit {
        RetryDecision::RemoteWorkerFailure
    } else {
        RetryDecision::DistributionFailure
    }
}

type Waiter = oneshot::Sender<Result<PipCompletionData, RetryableFailure>>;

#[derive(Default)]
pub struct PipCompletionTable {
    pending: DashMap<PipStepKey, Waiter>,
}

impl PipCompletionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Register a key this driver now expects a result for, returning the
    /// receiver half the caller awaits.
    pub fn register(&self, key: PipStepKey) -> oneshot::Receiver<Result<PipCompletionData, RetryableFailure>> {
        let (tx, rx) = oneshot::channel();
        self.pending.insert(key, tx);
        rx
    }

    pub fn cancel(&self, key: &PipStepKey) {
        self.pending.remove(key);
    }

    /// Resolve the completion for `data`'s `(pipId, step)`. A miss — nothing
    /// registered under that exact key — is a stale/duplicate result, logged
    /// and otherwise ignored.
    pub fn resolve(&self, data: PipCompletionData) {
        let key = PipStepKey::new(data.pip_id, data.step);
        match self.pending.remove(&key) {
            Some((_, waiter)) => {
                let _ = waiter.send(Ok(data));
            }
            None => {
                tracing::debug!(pip_id = %key.pip_id, step = %key.step, "stale completion ignored, no pending waiter");
            }
        }
    }

    /// Drain every pending waiter with a retryable failure (§7's
    /// `ConnectionLost` handling: "resolve all pending futures with
    /// retryable failure").
    pub fn fail_all(&self, cause: ConnectionFailureCause) {
        let keys: Vec<_> = self.pending.iter().map(|entry| *entry.key()).collect();
        for key in keys {
            if let Some((_, waiter)) = self.pending.remove(&key) {
                let _ = waiter.send(Err(RetryableFailure(cause)));
            }
        }
    }
}

#[cfg(test)]
#[path = "completion_tests.rs"]
mod tests;
