// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Orchestrator-side configuration (§6.3), layered the same way
//! `pd_worker::config` is: defaults, an optional TOML file, `PD_DIST_*`
//! environment overrides.

use std::time::Duration;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use thiserror::Error;

fn default_max_messages_per_batch() -> usize {
    64
}

fn default_worker_attach_timeout() -> Duration {
    Duration::from_secs(45 * 60)
}

fn default_attach_retry_interval() -> Duration {
    Duration::from_secs(60)
}

fn default_max_retry_limit_on_remote_workers() -> u32 {
    3
}

fn default_minimum_wait_for_remote_worker() -> Duration {
    Duration::from_secs(5)
}

fn default_batch_idle_timeout() -> Duration {
    Duration::from_millis(25)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    #[serde(default = "default_max_messages_per_batch")]
    pub max_messages_per_batch: usize,

    pub replicate_outputs_to_workers: bool,

    pub fire_forget_materialize_outputs: bool,

    pub enable_distributed_source_hashing: bool,

    #[serde(with = "crate::humantime::duration", default = "default_worker_attach_timeout")]
    pub worker_attach_timeout: Duration,

    #[serde(with = "crate::humantime::option", default)]
    pub remote_pip_timeout: Option<Duration>,

    #[serde(default = "default_max_retry_limit_on_remote_workers")]
    pub max_retry_limit_on_remote_workers: u32,

    #[serde(with = "crate::humantime::duration", default = "default_minimum_wait_for_remote_worker")]
    pub minimum_wait_for_remote_worker: Duration,

    #[serde(with = "crate::humantime::duration", default = "default_attach_retry_interval")]
    pub attach_retry_interval: Duration,

    /// How long the batcher waits for additional items after the first,
    /// before sending whatever it has (§4.6's "short timeout").
    #[serde(with = "crate::humantime::duration", default = "default_batch_idle_timeout")]
    pub batch_idle_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_messages_per_batch: default_max_messages_per_batch(),
            replicate_outputs_to_workers: false,
            fire_forget_materialize_outputs: false,
            enable_distributed_source_hashing: false,
            worker_attach_timeout: default_worker_attach_timeout(),
            remote_pip_timeout: None,
            max_retry_limit_on_remote_workers: default_max_retry_limit_on_remote_workers(),
            minimum_wait_for_remote_worker: default_minimum_wait_for_remote_worker(),
            attach_retry_interval: default_attach_retry_interval(),
            batch_idle_timeout: default_batch_idle_timeout(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] figment::Error),
}

impl OrchestratorConfig {
    pub fn load(path: Option<&std::path::Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(OrchestratorConfig::default()));
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        figment = figment.merge(Env::prefixed("PD_DIST_").split("_"));
        Ok(figment.extract()?)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
