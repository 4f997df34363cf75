// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::io::Write;
use std::time::Duration;

use super::*;

#[test]
fn defaults_match_the_documented_values() {
    let config = OrchestratorConfig::default();
    assert_eq!(config.max_messages_per_batch, 64);
    assert_eq!(config.worker_attach_timeout, Duration::from_secs(45 * 60));
    assert_eq!(config.attach_retry_interval, Duration::from_secs(60));
    assert_eq!(config.remote_pip_timeout, None);
}

#[test]
fn load_with_no_path_returns_defaults() {
    let config = OrchestratorConfig::load(None).unwrap();
    assert_eq!(config, OrchestratorConfig::default());
}

#[test]
fn a_toml_file_overrides_defaults() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
        max_retry_limit_on_remote_workers = 5
        attach_retry_interval = "30s"
        remote_pip_timeout = "2m"
        "#
    )
    .unwrap();

    let config = OrchestratorConfig::load(Some(file.path())).unwrap();
    assert_eq!(config.max_retry_limit_on_remote_workers, 5);
    assert_eq!(config.attach_retry_interval, Duration::from_secs(30));
    assert_eq!(config.remote_pip_timeout, Some(Duration::from_secs(120)));
}
