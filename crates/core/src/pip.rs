// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The pip/event/log data model (§3).
//!
//! Modeled the same way this codebase models its own wire-facing data
//! (`oj-core::effect::Effect`): a small set of plain serde structs/enums with
//! helper methods for logging, rather than a handwritten binary codec —
//! concrete RPC transport serialization is explicitly out of scope (§1), so
//! these types only need to round-trip through whatever framing `pd-wire`
//! chooses, not match any particular external wire format.

use serde::{Deserialize, Serialize};

use crate::ids::PipId;

/// A stage of processing a pip, in the order the scheduler drives it through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PipStep {
    MaterializeInputs,
    CacheLookup,
    ExecuteProcess,
    ExecuteNonProcessPip,
    PostProcess,
    MaterializeOutputs,
    HandleResult,
    Done,
}

impl std::fmt::Display for PipStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PipStep::MaterializeInputs => "MaterializeInputs",
            PipStep::CacheLookup => "CacheLookup",
            PipStep::ExecuteProcess => "ExecuteProcess",
            PipStep::ExecuteNonProcessPip => "ExecuteNonProcessPip",
            PipStep::PostProcess => "PostProcess",
            PipStep::MaterializeOutputs => "MaterializeOutputs",
            PipStep::HandleResult => "HandleResult",
            PipStep::Done => "Done",
        };
        write!(f, "{name}")
    }
}

/// What kind of pip this is. Steps other than `MaterializeOutputs` require
/// `Process` or `IPC` (§4.3); enforcing that is a hard assertion, not a
/// recoverable error, since a scheduler sending anything else is a
/// programming error upstream of this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PipType {
    Process,
    Ipc,
    Other,
}

/// Unique key for a unit of work: `(pipId, step)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PipStepKey {
    pub pip_id: PipId,
    pub step: PipStep,
}

impl PipStepKey {
    pub fn new(pip_id: PipId, step: PipStep) -> Self {
        Self { pip_id, step }
    }
}

impl std::fmt::Display for PipStepKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.pip_id, self.step)
    }
}

/// A path carried either as an intern-table index (when both peers share the
/// pip graph) or as a string (for dynamic outputs not present in the shared
/// path table). The intern table itself is an external collaborator (§1)
/// and is not modeled here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PathRef {
    Interned(u32),
    Dynamic(String),
}

impl PathRef {
    pub fn is_dynamic(&self) -> bool {
        matches!(self, PathRef::Dynamic(_))
    }
}

/// An association between a hashed file and a dynamic/opaque directory it
/// was produced under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedDirectoryRef {
    pub dir_path: PathRef,
    pub seal_id: u32,
    pub is_shared_opaque: bool,
}

/// Content hash and bookkeeping for one file artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileArtifactKeyedHash {
    pub path: PathRef,
    pub rewrite_count: u32,
    pub hash: Vec<u8>,
    pub size: u64,
    pub associated_directories: Vec<SealedDirectoryRef>,
    pub is_source_affected: bool,
    pub is_allowed_file_rewrite: bool,
}

/// Scheduler-reported memory expectations for a pip step, used by the
/// scheduler to decide concurrency; opaque to this crate beyond carrying it
/// through.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectedMemoryCounters {
    pub expected_ram_mb: u32,
    pub expected_peak_working_set_mb: u32,
}

/// One pip-step request within a `PipBuildRequest` batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinglePipBuildRequest {
    pub pip_id: PipId,
    pub step: PipStep,
    pub pip_type: PipType,
    pub priority: i32,
    pub fingerprint: Vec<u8>,
    pub expected_memory_counters: ExpectedMemoryCounters,
    pub activity_id: String,
    /// Unique per worker per build; used for at-most-once admission (§3).
    pub sequence_number: u64,
}

impl SinglePipBuildRequest {
    pub fn key(&self) -> PipStepKey {
        PipStepKey::new(self.pip_id, self.step)
    }
}

/// One RPC's worth of pip-step requests plus the file hashes they need.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipBuildRequest {
    pub pips: Vec<SinglePipBuildRequest>,
    pub hashes: Vec<FileArtifactKeyedHash>,
}

/// Result payload for one completed pip step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipCompletionData {
    pub pip_id: PipId,
    pub step: PipStep,
    pub result_blob: Vec<u8>,
    pub execute_step_ticks: u64,
    pub queue_ticks: u64,
    pub thread_id: u32,
    pub start_time_ticks: u64,
    pub before_send_ticks: u64,
}

/// Severity of a forwarded diagnostic event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventLevel {
    Informational,
    Warning,
    Error,
}

/// A forwarded diagnostic. `pip_semi_stable_hash` correlates the event with
/// an in-flight pip for the event-before-result ordering guarantee (§4.4/§5).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMessage {
    pub event_id: u32,
    pub level: EventLevel,
    pub text: String,
    pub pip_semi_stable_hash: Option<u64>,
}

impl EventMessage {
    /// Extract the pip this event belongs to: the structured field when
    /// present, else a best-effort regex over the text (§4.4). The regex
    /// fallback is deliberately narrow — the structured field is always
    /// populated by a well-behaved scheduler; the text scan only exists to
    /// catch events forwarded from components that stringify everything.
    pub fn extract_pip_hash(&self) -> Option<u64> {
        if let Some(hash) = self.pip_semi_stable_hash {
            return Some(hash);
        }
        extract_pip_hash_from_text(&self.text)
    }
}

/// Looks for a `Pip<HEXDIGITS>` marker in free-form event text, e.g.
/// `"Pip2A3F00: process exited with code 1"`.
fn extract_pip_hash_from_text(text: &str) -> Option<u64> {
    let idx = text.find("Pip")?;
    let rest = &text[idx + 3..];
    let hex_len = rest.chars().take_while(|c| c.is_ascii_hexdigit()).count();
    if hex_len == 0 {
        return None;
    }
    u64::from_str_radix(&rest[..hex_len], 16).ok()
}

/// Which execution-log channel a blob belongs to; each channel has its own
/// strictly-increasing sequence space (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogChannel {
    General,
    BuildManifest,
}

/// A chunk of a binary execution-log stream. `sequence_number` is strictly
/// monotone per `LogChannel`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionLogBlob {
    pub channel: LogChannel,
    pub data: Vec<u8>,
    pub sequence_number: i64,
}

#[cfg(test)]
#[path = "pip_tests.rs"]
mod tests;
