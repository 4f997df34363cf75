// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Collaborator traits consumed from the local pip scheduler (§6.4), modeled
//! as `async-trait` interfaces with in-memory fakes, the same way
//! `crates/adapters/src/notify.rs` models `NotifyAdapter`: the worker
//! depends on the trait, a real scheduler implementation is out of scope
//! (§1), and tests run against the fake.

use std::sync::Arc;

use async_trait::async_trait;
use pd_core::pip::{FileArtifactKeyedHash, PipCompletionData, PipId, PipStep, SealedDirectoryRef};

/// Outcome the scheduler reports back through a step's observer.
#[derive(Debug, Clone)]
pub enum ExecutionOutcome {
    Completed(PipCompletionData),
    Failed { pip_id: PipId, step: PipStep, message: String },
}

/// Callback surface the scheduler drives while running a step (§6.4:
/// `observer.StartStep`/`observer.EndStep`).
pub trait StepObserver: Send + Sync {
    /// Called once the scheduler has committed to running the step, before
    /// any result is available; gives the worker a chance to note cache-miss
    /// hints. Default is a no-op — most steps don't need it.
    fn on_start(&self, _pip_id: PipId, _step: PipStep) {}

    /// Called exactly once with the step's final outcome.
    fn on_end(&self, outcome: ExecutionOutcome);
}

/// The local pip scheduler/executor (§6.4). `start_pip_step` is
/// fire-and-forget from the caller's point of view — progress and
/// completion are reported through `observer`, not the returned future.
#[async_trait]
pub trait PipScheduler: Send + Sync + 'static {
    async fn start_pip_step(
        &self,
        pip_id: PipId,
        step: PipStep,
        priority: i32,
        observer: Arc<dyn StepObserver>,
    );
}

/// Reports verified file content and dynamic directory membership to the
/// scheduler's content tracking (§6.4).
#[async_trait]
pub trait FileContentManager: Send + Sync + 'static {
    async fn report_worker_pip_input_content(&self, hash: &FileArtifactKeyedHash) -> bool;

    async fn report_dynamic_directory_contents(
        &self,
        directory: &SealedDirectoryRef,
        files: &[FileArtifactKeyedHash],
        origin_pip: PipId,
    );
}

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(coverage_nightly, coverage(off))]
pub mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashSet;

    /// In-memory scheduler fake. Every step it's asked to run is recorded
    /// immediately and completed synchronously (within the same call) with a
    /// canned empty result, unless a specific outcome was queued for that
    /// `(pipId, step)` via [`FakeScheduler::queue_outcome`].
    #[derive(Default, Clone)]
    pub struct FakeScheduler {
        inner: Arc<Mutex<FakeSchedulerState>>,
    }

    #[derive(Default)]
    struct FakeSchedulerState {
        started: Vec<(PipId, PipStep)>,
        queued: std::collections::HashMap<(PipId, PipStep), ExecutionOutcome>,
    }

    impl FakeScheduler {
        pub fn new() -> Self {
            Self::default()
        }

        /// Pre-arm the outcome a future `start_pip_step` call for this key
        /// reports, instead of the default empty success.
        pub fn queue_outcome(&self, pip_id: PipId, step: PipStep, outcome: ExecutionOutcome) {
            self.inner.lock().queued.insert((pip_id, step), outcome);
        }

        pub fn started(&self) -> Vec<(PipId, PipStep)> {
            self.inner.lock().started.clone()
        }
    }

    #[async_trait]
    impl PipScheduler for FakeScheduler {
        async fn start_pip_step(
            &self,
            pip_id: PipId,
            step: PipStep,
            _priority: i32,
            observer: Arc<dyn StepObserver>,
        ) {
            let outcome = {
                let mut state = self.inner.lock();
                state.started.push((pip_id, step));
                state.queued.remove(&(pip_id, step)).unwrap_or(ExecutionOutcome::Completed(
                    PipCompletionData {
                        pip_id,
                        step,
                        result_blob: Vec::new(),
                        execute_step_ticks: 0,
                        queue_ticks: 0,
                        thread_id: 0,
                        start_time_ticks: 0,
                        before_send_ticks: 0,
                    },
                ))
            };
            observer.on_start(pip_id, step);
            observer.on_end(outcome);
        }
    }

    /// In-memory content manager fake. All reported content is accepted
    /// unless explicitly marked to be rejected via [`FakeFileContentManager::reject`].
    #[derive(Default, Clone)]
    pub struct FakeFileContentManager {
        rejected: Arc<Mutex<HashSet<Vec<u8>>>>,
        reports: Arc<Mutex<Vec<Vec<u8>>>>,
    }

    impl FakeFileContentManager {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn reject(&self, hash: Vec<u8>) {
            self.rejected.lock().insert(hash);
        }

        pub fn reported_hashes(&self) -> Vec<Vec<u8>> {
            self.reports.lock().clone()
        }
    }

    #[async_trait]
    impl FileContentManager for FakeFileContentManager {
        async fn report_worker_pip_input_content(&self, hash: &FileArtifactKeyedHash) -> bool {
            self.reports.lock().push(hash.hash.clone());
            !self.rejected.lock().contains(&hash.hash)
        }

        async fn report_dynamic_directory_contents(
            &self,
            _directory: &SealedDirectoryRef,
            _files: &[FileArtifactKeyedHash],
            _origin_pip: PipId,
        ) {
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeFileContentManager, FakeScheduler};

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
