// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared data model and primitives for the pip distribution runtime.
//!
//! This crate holds the types both the worker and the orchestrator agree on:
//! identifiers, the worker status state machine, the pip/event/log data
//! model, the connection-failure taxonomy, and small testable infrastructure
//! (`Clock`) used to keep timeout-driven logic deterministic in tests.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod clock;
pub mod error;
pub mod ids;
pub mod invocation;
pub mod pip;
pub mod status;
pub mod supervisor;

pub use clock::{Clock, FakeClock, SystemClock};
pub use error::{ConnectionFailureCause, DistributionError};
pub use ids::{PipId, WorkerId};
pub use invocation::InvocationId;
pub use pip::{
    EventMessage, ExecutionLogBlob, FileArtifactKeyedHash, LogChannel, PathRef,
    PipBuildRequest, PipCompletionData, PipStep, PipStepKey, PipType, SealedDirectoryRef,
    SinglePipBuildRequest,
};
pub use status::{LifecycleSm, WorkerStatus};
pub use supervisor::ConnectionSupervisor;
