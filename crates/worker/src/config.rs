// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Layered configuration (§6.3): defaults baked into the struct, overridden
//! by an optional TOML file, overridden by `PD_DIST_*` environment
//! variables — the same shape as this codebase's `Config::load()`
//! convention (`crates/daemon/src/lifecycle/mod.rs`), built on `figment`
//! the way `golem-worker-executor`'s own config loading does.

use std::time::Duration;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use thiserror::Error;

fn default_build_service_port() -> u16 {
    7999
}

fn default_advertised_host() -> String {
    "127.0.0.1".to_string()
}

fn default_max_messages_per_batch() -> usize {
    64
}

fn default_worker_attach_timeout() -> Duration {
    Duration::from_secs(45 * 60)
}

fn default_max_retry_limit_on_remote_workers() -> u32 {
    3
}

fn default_minimum_wait_for_remote_worker() -> Duration {
    Duration::from_secs(5)
}

/// Recognized configuration options (§6.3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    #[serde(default = "default_build_service_port")]
    pub build_service_port: u16,

    /// Host reported to the orchestrator's `Hello` RPC as this worker's
    /// `ServiceLocation` (§4.2).
    #[serde(default = "default_advertised_host")]
    pub advertised_host: String,

    #[serde(default = "default_max_messages_per_batch")]
    pub max_messages_per_batch: usize,

    pub fire_forget_materialize_outputs: bool,

    /// Omit source files from the hash list the orchestrator sends this
    /// worker (§6.3) — they're assumed already available locally, so this
    /// worker skips verifying them through `InputReporter` as well.
    pub enable_distributed_source_hashing: bool,

    #[serde(with = "humantime_duration", default = "default_worker_attach_timeout")]
    pub worker_attach_timeout: Duration,

    #[serde(with = "humantime_duration::option", default)]
    pub remote_pip_timeout: Option<Duration>,

    #[serde(default = "default_max_retry_limit_on_remote_workers")]
    pub max_retry_limit_on_remote_workers: u32,

    #[serde(with = "humantime_duration", default = "default_minimum_wait_for_remote_worker")]
    pub minimum_wait_for_remote_worker: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            build_service_port: default_build_service_port(),
            advertised_host: default_advertised_host(),
            max_messages_per_batch: default_max_messages_per_batch(),
            fire_forget_materialize_outputs: false,
            enable_distributed_source_hashing: false,
            worker_attach_timeout: default_worker_attach_timeout(),
            remote_pip_timeout: None,
            max_retry_limit_on_remote_workers: default_max_retry_limit_on_remote_workers(),
            minimum_wait_for_remote_worker: default_minimum_wait_for_remote_worker(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] figment::Error),
}

impl WorkerConfig {
    /// Defaults, overridden by `path` if given, overridden by `PD_DIST_*`
    /// environment variables (e.g. `PD_DIST_BUILD_SERVICE_PORT=9001`).
    pub fn load(path: Option<&std::path::Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(WorkerConfig::default()));
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        figment = figment.merge(Env::prefixed("PD_DIST_").split("_"));
        Ok(figment.extract()?)
    }
}

/// `humantime`-style `"45m"` / `"60s"` duration (de)serialization, matching
/// the form the worker's own queue-poll intervals are written in. Built on
/// `Duration`'s `Display`-less representation directly rather than pulling
/// in the `humantime` crate for a handful of call sites.
mod humantime_duration {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        format!("{}s", value.as_secs()).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }

    pub mod option {
        use super::parse;
        use serde::{Deserialize, Deserializer, Serialize, Serializer};
        use std::time::Duration;

        pub fn serialize<S: Serializer>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error> {
            match value {
                Some(duration) => format!("{}s", duration.as_secs()).serialize(serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Duration>, D::Error> {
            let raw: Option<String> = Option::deserialize(deserializer)?;
            raw.map(|raw| parse(&raw).map_err(serde::de::Error::custom)).transpose()
        }
    }

    fn parse(raw: &str) -> Result<Duration, String> {
        let raw = raw.trim();
        let (digits, unit) = raw.split_at(raw.find(|c: char| !c.is_ascii_digit()).unwrap_or(raw.len()));
        let value: u64 = digits.parse().map_err(|_| format!("invalid duration '{raw}'"))?;
        match unit {
            "s" | "" => Ok(Duration::from_secs(value)),
            "m" => Ok(Duration::from_secs(value * 60)),
            "h" => Ok(Duration::from_secs(value * 3600)),
            "ms" => Ok(Duration::from_millis(value)),
            other => Err(format!("unrecognized duration unit '{other}' in '{raw}'")),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
