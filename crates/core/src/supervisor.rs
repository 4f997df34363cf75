// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Connection supervision: single-shot failure handling and cancellation
//! fan-out (§4/§9).
//!
//! Per the design note in §9, connection loss is modeled as a message-driven
//! state update rather than relying on implicit event-loop semantics: the
//! first call to `fail` atomically flips a flag via `compare_exchange` and
//! runs the registered drain callbacks exactly once; every subsequent call
//! (whatever the reported cause) is a no-op. This is the single-shot
//! `onConnectionFailure` referenced throughout §4.6/§7.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::error::ConnectionFailureCause;

type DrainFn = Box<dyn FnOnce(ConnectionFailureCause) + Send>;

/// Tracks connectivity for one peer (a worker, from the orchestrator's point
/// of view, or the orchestrator, from the worker's) and guarantees that
/// failure handling — cancelling in-flight work, resolving pending futures
/// with a retryable failure — runs exactly once regardless of how many
/// transport errors arrive concurrently.
pub struct ConnectionSupervisor {
    failed: AtomicBool,
    cause: Mutex<Option<ConnectionFailureCause>>,
    on_fail: Mutex<Vec<DrainFn>>,
}

impl ConnectionSupervisor {
    pub fn new() -> Self {
        Self { failed: AtomicBool::new(false), cause: Mutex::new(None), on_fail: Mutex::new(Vec::new()) }
    }

    /// Register a callback to run if/when the connection fails. If the
    /// connection has already failed by the time this is called, the
    /// callback runs immediately with the recorded cause — there is no
    /// window in which a late registrant misses the failure.
    pub fn on_failure<F>(&self, callback: F)
    where
        F: FnOnce(ConnectionFailureCause) + Send + 'static,
    {
        if self.failed.load(Ordering::Acquire) {
            let cause = self.cause.lock().unwrap_or(ConnectionFailureCause::UnrecoverableFailure);
            callback(cause);
            return;
        }
        self.on_fail.lock().push(Box::new(callback));
    }

    /// Report a connection failure. Returns `true` if this call won the
    /// race and triggered the drain callbacks, `false` if the connection had
    /// already been marked failed by an earlier call.
    pub fn fail(&self, cause: ConnectionFailureCause) -> bool {
        if self.failed.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire).is_err()
        {
            return false;
        }

        *self.cause.lock() = Some(cause);
        let callbacks = std::mem::take(&mut *self.on_fail.lock());
        for callback in callbacks {
            callback(cause);
        }
        true
    }

    pub fn is_failed(&self) -> bool {
        self.failed.load(Ordering::Acquire)
    }

    pub fn cause(&self) -> Option<ConnectionFailureCause> {
        *self.cause.lock()
    }
}

impl Default for ConnectionSupervisor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
