// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::ids::PipId;

#[test]
fn pip_step_key_displays_as_pip_slash_step() {
    let key = PipStepKey::new(PipId::new(7), PipStep::ExecuteProcess);
    assert_eq!(key.to_string(), format!("{}/ExecuteProcess", PipId::new(7)));
}

#[test]
fn single_pip_build_request_key_matches_its_fields() {
    let req = SinglePipBuildRequest {
        pip_id: PipId::new(0x200),
        step: PipStep::CacheLookup,
        pip_type: PipType::Process,
        priority: 0,
        fingerprint: vec![1, 2, 3],
        expected_memory_counters: ExpectedMemoryCounters::default(),
        activity_id: "a1".to_string(),
        sequence_number: 7,
    };
    assert_eq!(req.key(), PipStepKey::new(PipId::new(0x200), PipStep::CacheLookup));
}

#[test]
fn path_ref_distinguishes_interned_from_dynamic() {
    assert!(!PathRef::Interned(4).is_dynamic());
    assert!(PathRef::Dynamic("out/foo.txt".to_string()).is_dynamic());
}

#[test]
fn event_message_prefers_structured_pip_hash_over_text() {
    let event = EventMessage {
        event_id: 1,
        level: EventLevel::Warning,
        text: "Pip00FF: ignored, should not be used".to_string(),
        pip_semi_stable_hash: Some(0xABCD),
    };
    assert_eq!(event.extract_pip_hash(), Some(0xABCD));
}

#[test]
fn event_message_falls_back_to_text_marker() {
    let event = EventMessage {
        event_id: 2,
        level: EventLevel::Error,
        text: "Pip2A3F: process exited with code 1".to_string(),
        pip_semi_stable_hash: None,
    };
    assert_eq!(event.extract_pip_hash(), Some(0x2A3F));
}

#[test]
fn event_message_with_no_marker_and_no_field_yields_none() {
    let event = EventMessage {
        event_id: 3,
        level: EventLevel::Informational,
        text: "build starting".to_string(),
        pip_semi_stable_hash: None,
    };
    assert_eq!(event.extract_pip_hash(), None);
}

#[test]
fn execution_log_blob_carries_its_channel_and_sequence() {
    let blob = ExecutionLogBlob { channel: LogChannel::BuildManifest, data: vec![0, 1], sequence_number: 5 };
    assert_eq!(blob.sequence_number, 5);
    assert_eq!(blob.channel, LogChannel::BuildManifest);
}

#[test]
fn pip_build_request_default_is_empty() {
    let req = PipBuildRequest::default();
    assert!(req.pips.is_empty());
    assert!(req.hashes.is_empty());
}
