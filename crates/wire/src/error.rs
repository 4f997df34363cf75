// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! RPC-surface error taxonomy (§7). Kept separate from `pd_core::DistributionError`
//! because these variants are about the call itself, not the in-process state
//! they cause.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RpcError {
    #[error("call deadline exceeded")]
    DeadlineExceeded,

    #[error("transport closed")]
    TransportClosed,

    #[error("invocation id mismatch")]
    InvocationMismatch,

    #[error("unrecoverable failure: {0}")]
    Unrecoverable(String),
}
