// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `"45m"` / `"60s"` duration (de)serialization shared by every duration
//! field in [`crate::config::OrchestratorConfig`]. Mirrors `pd_worker::config`'s
//! private module of the same shape; kept as its own small module here since
//! more than one field needs it.

pub mod duration {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        format!("{}s", value.as_secs()).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }

    pub(super) fn parse(raw: &str) -> Result<Duration, String> {
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

pub mod option {
    use super::duration::parse;
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
