//! Integration test: configuration file on disk → validated runner.

use go2_common::config::ConfigError;
use go2_common::transport::LocalBus;
use go2_common::wire::LowState;
use go2_control_unit::cache::SnapshotCache;
use go2_control_unit::config::load_config;
use go2_control_unit::cycle::CycleRunner;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

const CU_TOML: &str = r#"
cycle_time_us = 1000

[shared]
service_name = "cu-test"
log_level = "debug"

[topics]
lowcmd = "test/lowcmd"
lowstate = "test/lowstate"

[trajectory]
frequency_hz = 0.5
kp = 4.0

[[trajectory.joints]]
slot = 5
neutral = 0.7
amplitude = 0.2
commanded = true

[[trajectory.joints]]
slot = 6
neutral = -1.0
commanded = false
"#;

fn write_config(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("tempfile");
    file.write_all(content.as_bytes()).expect("write");
    file
}

#[test]
fn test_config_file_builds_runner() {
    let file = write_config(CU_TOML);
    let config = load_config(file.path()).expect("valid config");

    assert_eq!(config.cycle_time_us, 1000);
    assert_eq!(config.shared.service_name, "cu-test");
    assert_eq!(config.topics.lowcmd, "test/lowcmd");
    assert_eq!(config.trajectory.joints.len(), 2);

    let bus = LocalBus::new();
    let runner = CycleRunner::new(
        config.trajectory.clone(),
        Duration::from_micros(config.cycle_time_us),
        Arc::new(SnapshotCache::new(LowState::default())),
        bus.publisher(&config.topics.lowcmd),
    )
    .expect("runner");
    assert_eq!(runner.cycle_time(), Duration::from_micros(1000));
    assert_eq!(runner.trajectory().params().kp, 4.0);
}

#[test]
fn test_missing_config_file_is_reported() {
    let dir = tempfile::tempdir().expect("tempdir");
    let err = load_config(&dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::FileNotFound(_)), "got: {err:?}");
}

#[test]
fn test_invalid_joint_slot_in_file_is_rejected() {
    let file = write_config(
        r#"
[[trajectory.joints]]
slot = 20
neutral = 0.0
commanded = true
"#,
    );
    let err = load_config(file.path()).unwrap_err();
    assert!(err.to_string().contains("slot 20"), "got: {err}");
}
