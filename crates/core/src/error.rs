// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared error taxonomy (§7).

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Abstract causes of connection failure, as classified in §3/§7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionFailureCause {
    CallDeadlineExceeded,
    ReconnectionTimeout,
    UnrecoverableFailure,
    RemotePipTimeout,
    HeartbeatFailure,
    AttachmentTimeout,
}

impl std::fmt::Display for ConnectionFailureCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ConnectionFailureCause::CallDeadlineExceeded => "call deadline exceeded",
            ConnectionFailureCause::ReconnectionTimeout => "reconnection timeout",
            ConnectionFailureCause::UnrecoverableFailure => "unrecoverable failure",
            ConnectionFailureCause::RemotePipTimeout => "remote pip timeout",
            ConnectionFailureCause::HeartbeatFailure => "heartbeat failure",
            ConnectionFailureCause::AttachmentTimeout => "attachment timeout",
        };
        write!(f, "{name}")
    }
}

/// Shared error type for both crates' non-RPC-specific failures.
///
/// RPC-surface errors live in `pd-wire` (they need to be serializable across
/// the transport); this enum covers the failure kinds from §7's taxonomy
/// that are reasoned about purely in-process.
#[derive(Debug, Error)]
pub enum DistributionError {
    #[error("attachment timed out: {0}")]
    AttachmentTimeout(String),

    #[error("connection lost: {0}")]
    ConnectionLost(ConnectionFailureCause),

    #[error("unrecoverable failure: {0}")]
    UnrecoverableFailure(String),

    #[error("input report mismatch: {0} file(s) failed verification")]
    VerifySourceFilesFailed(usize),

    #[error("pip step mismatch: expected {expected:?}, got {actual:?}")]
    StepMismatch { expected: crate::pip::PipStep, actual: crate::pip::PipStep },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_failure_cause_displays_readably() {
        assert_eq!(ConnectionFailureCause::RemotePipTimeout.to_string(), "remote pip timeout");
    }
}
