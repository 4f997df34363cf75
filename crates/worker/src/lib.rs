// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker-side distribution runtime: attach handshake, idempotent request
//! intake, and batched notification egress.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod config;
pub mod exec_log;
pub mod health;
pub mod intake;
pub mod lifecycle;
pub mod notify;
pub mod scheduler;

pub use config::WorkerConfig;
pub use exec_log::ExecutionLogStream;
pub use health::WorkerHealth;
pub use intake::{InputReporter, RequestIntake};
pub use lifecycle::Worker;
pub use notify::NotificationManager;
pub use scheduler::{ExecutionOutcome, FileContentManager, PipScheduler, StepObserver};
