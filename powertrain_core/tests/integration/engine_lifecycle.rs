//! Integration test: engine stop, decay and restart through the starter.

use powertrain_common::powertrain::config::PowertrainConfig;
use powertrain_common::powertrain::events::PowertrainEvent;
use powertrain_common::powertrain::io::DriverInput;
use powertrain_common::powertrain::state::{DriveMode, EngineRunState};

use super::harness::{Rig, rolling, throttle, ticks};

fn toggle() -> DriverInput {
    DriverInput {
        engine_toggle: true,
        ..DriverInput::default()
    }
}

fn lifecycle_events(rig: &Rig) -> Vec<PowertrainEvent> {
    rig.events
        .iter()
        .copied()
        .filter(|e| matches!(e, PowertrainEvent::EngineStarted | PowertrainEvent::EngineStopped))
        .collect()
}

#[test]
fn switched_off_engine_decays_to_zero_without_torque() {
    let mut rig = Rig::with_defaults();
    let fb = rolling(0.0);
    for _ in 0..ticks(0.5) {
        rig.step_frozen(&throttle(0.0), &fb);
    }

    let first = rig.step_frozen(&toggle(), &fb);
    assert_eq!(first.run_state, EngineRunState::Off);

    let mut prev = first.rpm;
    // Throttle is ignored with the engine off.
    for _ in 0..ticks(1.5) {
        let s = rig.step_frozen(&throttle(1.0), &fb);
        assert_eq!(s.mode, DriveMode::EngineOff);
        assert_eq!(s.out.total_motor_torque(), 0.0);
        assert!(s.rpm <= prev);
        prev = s.rpm;
    }
    assert_eq!(prev, 0.0);
    assert_eq!(lifecycle_events(&rig), vec![PowertrainEvent::EngineStopped]);
}

#[test]
fn restart_runs_the_starter_then_idles() {
    let cfg = PowertrainConfig::default();
    let starter = cfg.engine.starter_duration;
    let idle = cfg.engine.idle_rpm;
    let mut rig = Rig::new(cfg);
    let fb = rolling(0.0);

    rig.step_frozen(&toggle(), &fb);
    for _ in 0..ticks(1.0) {
        rig.step_frozen(&throttle(0.0), &fb);
    }
    assert_eq!(rig.pt.engine_rpm(), 0.0);

    let s = rig.step_frozen(&toggle(), &fb);
    assert_eq!(s.run_state, EngineRunState::Starting);
    let mut cranking = vec![s];
    for _ in 0..ticks(starter + 0.2) {
        cranking.push(rig.step_frozen(&throttle(0.0), &fb));
    }

    let spin: Vec<_> = cranking
        .iter()
        .filter(|s| s.run_state == EngineRunState::Starting)
        .collect();
    assert!(!spin.is_empty());
    for s in &spin {
        assert_eq!(s.mode, DriveMode::StarterSpin);
        assert_eq!(s.out.total_motor_torque(), 0.0);
    }
    assert!(spin.windows(2).all(|w| w[1].rpm >= w[0].rpm));

    assert_eq!(rig.pt.run_state(), EngineRunState::Running);
    assert!(rig.pt.engine_rpm() >= idle);
    assert_eq!(
        lifecycle_events(&rig),
        vec![PowertrainEvent::EngineStopped, PowertrainEvent::EngineStarted]
    );
}

#[test]
fn toggles_inside_the_debounce_window_are_ignored() {
    let mut rig = Rig::with_defaults();
    let fb = rolling(0.0);
    rig.step_frozen(&toggle(), &fb);
    rig.step_frozen(&throttle(0.0), &fb);
    rig.step_frozen(&toggle(), &fb);
    assert_eq!(rig.pt.run_state(), EngineRunState::Off);
    assert_eq!(lifecycle_events(&rig), vec![PowertrainEvent::EngineStopped]);
}

#[test]
fn engine_can_spawn_off() {
    let mut cfg = PowertrainConfig::default();
    cfg.engine.start_running = false;
    let mut rig = Rig::new(cfg);
    assert_eq!(rig.pt.run_state(), EngineRunState::Off);
    assert_eq!(rig.pt.engine_rpm(), 0.0);

    let s = rig.step_frozen(&throttle(1.0), &rolling(0.0));
    assert_eq!(s.mode, DriveMode::EngineOff);
    assert_eq!(s.out.total_motor_torque(), 0.0);
}
