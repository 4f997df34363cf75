// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::io::Write;
use std::time::Duration;

use super::*;

#[test]
fn defaults_match_the_documented_values() {
    let config = WorkerConfig::default();
    assert_eq!(config.build_service_port, 7999);
    assert_eq!(config.max_messages_per_batch, 64);
    assert_eq!(config.worker_attach_timeout, Duration::from_secs(45 * 60));
    assert_eq!(config.remote_pip_timeout, None);
}

#[test]
fn load_with_no_path_returns_defaults() {
    let config = WorkerConfig::load(None).unwrap();
    assert_eq!(config, WorkerConfig::default());
}

#[test]
fn a_toml_file_overrides_defaults_and_parses_human_durations() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
        build_service_port = 9001
        worker_attach_timeout = "30m"
        remote_pip_timeout = "10s"
        "#
    )
    .unwrap();

    let config = WorkerConfig::load(Some(file.path())).unwrap();
    assert_eq!(config.build_service_port, 9001);
    assert_eq!(config.worker_attach_timeout, Duration::from_secs(30 * 60));
    assert_eq!(config.remote_pip_timeout, Some(Duration::from_secs(10)));
    // Untouched fields keep their defaults.
    assert_eq!(config.max_messages_per_batch, 64);
}
