// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker status state machine.
//!
//! `WorkerStatus` is a partial order (`NotStarted < Starting < Started <
//! Running`; `Stopping`/`Stopped` are sink states reachable from any
//! non-sink state; `Stopped` is terminal) collapsed into a total order for
//! the purpose of atomic, monotone-only transitions: once the status moves
//! forward it can never move back, matching §3's invariant. `LifecycleSm`
//! is the CAS-based transition engine described in §4.1, adapted from this
//! codebase's convention of keeping daemon-wide state behind a single
//! atomic integer guarded by `compare_exchange` rather than a mutex.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Worker lifecycle status.
///
/// Numeric discriminants double as the total order used by
/// `LifecycleSm::try_transition`: a transition only succeeds if it strictly
/// increases this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum WorkerStatus {
    NotStarted = 0,
    Starting = 1,
    Started = 2,
    Running = 3,
    Stopping = 4,
    Stopped = 5,
}

impl WorkerStatus {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => WorkerStatus::NotStarted,
            1 => WorkerStatus::Starting,
            2 => WorkerStatus::Started,
            3 => WorkerStatus::Running,
            4 => WorkerStatus::Stopping,
            _ => WorkerStatus::Stopped,
        }
    }

    /// `true` once the status has reached `Stopping` or `Stopped`.
    pub fn is_sink(self) -> bool {
        matches!(self, WorkerStatus::Stopping | WorkerStatus::Stopped)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, WorkerStatus::Stopped)
    }
}

type Observer = Box<dyn Fn(WorkerStatus, WorkerStatus) + Send + Sync>;

/// Atomic worker status state machine with observer callbacks.
///
/// All transitions go through `try_transition`, which performs a single
/// compare-and-swap: illegal (non-forward) transitions return `false`
/// without any side effect, and repeated requests for a sink state coalesce
/// into a single no-op (§4.1's "Failure semantics").
pub struct LifecycleSm {
    status: AtomicU8,
    ever_available: AtomicBool,
    observers: Mutex<Vec<Observer>>,
}

impl LifecycleSm {
    pub fn new() -> Self {
        Self {
            status: AtomicU8::new(WorkerStatus::NotStarted as u8),
            ever_available: AtomicBool::new(false),
            observers: Mutex::new(Vec::new()),
        }
    }

    pub fn status(&self) -> WorkerStatus {
        WorkerStatus::from_u8(self.status.load(Ordering::Acquire))
    }

    /// `true` if the worker has ever reached `Running`, even if it has since
    /// moved on to `Stopping`/`Stopped`. Used for the orchestrator's
    /// "problematic worker" classification in `Disconnect` (§4.6).
    pub fn ever_available(&self) -> bool {
        self.ever_available.load(Ordering::Acquire)
    }

    /// Register an observer invoked with `(from, to)` on every successful
    /// transition. Observers run synchronously on the caller that won the
    /// CAS; keep them cheap (this mirrors the teacher's status-change
    /// telemetry hook, which only ever logs or increments a counter).
    pub fn add_observer<F>(&self, observer: F)
    where
        F: Fn(WorkerStatus, WorkerStatus) + Send + Sync + 'static,
    {
        self.observers.lock().push(Box::new(observer));
    }

    /// Attempt to move the status forward to `to`. Returns `false` without
    /// any side effect if `to` is not strictly greater than the current
    /// status (illegal or redundant transition).
    pub fn try_transition(&self, to: WorkerStatus) -> bool {
        let target = to as u8;
        let result =
            self.status.fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                if current < target {
                    Some(target)
                } else {
                    None
                }
            });

        let Ok(previous) = result else {
            return false;
        };

        let from = WorkerStatus::from_u8(previous);
        if to == WorkerStatus::Running {
            self.ever_available.store(true, Ordering::Release);
        }

        for observer in self.observers.lock().iter() {
            observer(from, to);
        }

        true
    }
}

impl Default for LifecycleSm {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
