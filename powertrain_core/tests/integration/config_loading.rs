//! Integration test: vehicle file → repaired powertrain.

use std::io::Write;

use tempfile::NamedTempFile;

use powertrain_common::config::{ConfigError, LogLevel};
use powertrain_common::powertrain::flags::ConfigRepair;
use powertrain_common::powertrain::state::ShiftMode;

use powertrain_core::Powertrain;
use powertrain_core::config::load_config;

fn write_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn file_values_reach_the_core() {
    let file = write_file(
        r#"
version = 1

[gearbox]
ratios = [-3.0, 0.0, 3.3, 2.0, 1.3]
final_drive = 4.1
mode = "manual"

[engine]
idle_rpm = 850.0
starter_rpm = 850.0

[runner]
step_hz = 100
log_level = "debug"
"#,
    );

    let loaded = load_config(file.path()).unwrap();
    assert_eq!(loaded.runner.log_level, LogLevel::Debug);
    assert!((loaded.runner.step_s() - 0.01).abs() < 1e-12);

    let pt = Powertrain::new(loaded.powertrain);
    assert!(pt.config_repairs().is_empty());
    assert_eq!(pt.shift_mode(), ShiftMode::Manual);
    assert_eq!(pt.table().final_drive(), 4.1);
    assert_eq!(pt.table().label(pt.table().top_gear()).as_char(), '3');
    assert!((pt.engine_rpm() - 850.0).abs() < 1e-9);
}

#[test]
fn malformed_ratios_are_repaired_not_rejected() {
    let file = write_file("[gearbox]\nratios = [2.5, 0.3, 1.0, 2.0]\n");

    let loaded = load_config(file.path()).unwrap();
    let pt = Powertrain::new(loaded.powertrain);

    let repairs = pt.config_repairs();
    assert!(repairs.contains(ConfigRepair::REVERSE_RATIO));
    assert!(repairs.contains(ConfigRepair::NEUTRAL_RATIO));
    assert!(repairs.contains(ConfigRepair::FORWARD_RATIOS));
    assert!(pt.table().ratio(0) < 0.0);
    assert_eq!(pt.table().ratio(1), 0.0);
}

#[test]
fn future_version_is_rejected() {
    let file = write_file("version = 99\n");
    assert!(matches!(
        load_config(file.path()),
        Err(ConfigError::ValidationError(_))
    ));
}

#[test]
fn telemetry_serializes_to_json() {
    let pt = Powertrain::new(Default::default());
    let json = serde_json::to_value(pt.telemetry()).unwrap();
    assert_eq!(json["gear_label"], "1");
    assert_eq!(json["run_state"], "Running");
    assert!(json["engine_rpm"].as_f64().unwrap() > 0.0);
}
