//! Integration test: launch control and burnout with the wheels held.

use powertrain_common::consts::FIRST_FORWARD_GEAR;
use powertrain_common::powertrain::config::PowertrainConfig;
use powertrain_common::powertrain::events::PowertrainEvent;
use powertrain_common::powertrain::io::DriverInput;
use powertrain_common::powertrain::state::{DriveMode, LaunchState};

use super::harness::{DT, Rig, rolling, throttle, ticks};

fn launch_events(rig: &Rig) -> Vec<(LaunchState, LaunchState)> {
    rig.events
        .iter()
        .filter_map(|e| match *e {
            PowertrainEvent::LaunchStateChanged { from, to } => Some((from, to)),
            _ => None,
        })
        .collect()
}

#[test]
fn launch_times_out_into_cooldown() {
    let cfg = PowertrainConfig::default();
    let max_active = cfg.launch.max_active;
    let launch_rpm = cfg.launch.launch_rpm;
    let mut rig = Rig::new(cfg);
    let fb = rolling(0.0);

    let samples: Vec<_> = (0..ticks(3.0))
        .map(|_| rig.step_frozen(&throttle(1.0), &fb))
        .collect();

    assert_eq!(
        launch_events(&rig),
        vec![
            (LaunchState::Idle, LaunchState::Armed),
            (LaunchState::Armed, LaunchState::Active),
            (LaunchState::Active, LaunchState::Cooldown),
        ]
    );
    let active: Vec<_> = samples.iter().filter(|s| s.launch == LaunchState::Active).collect();
    let active_time = active.len() as f64 * DT;
    assert!((active_time - max_active).abs() <= 2.0 * DT, "active for {active_time}s");
    assert!(active.last().unwrap().rpm >= launch_rpm);
    assert_eq!(samples.last().unwrap().launch, LaunchState::Cooldown);
    assert_eq!(rig.pt.gear_index(), FIRST_FORWARD_GEAR);
}

#[test]
fn lifting_ends_an_active_launch() {
    let mut rig = Rig::with_defaults();
    let fb = rolling(0.0);
    for _ in 0..ticks(0.5) {
        rig.step_frozen(&throttle(1.0), &fb);
    }
    assert!(rig.pt.launch_active());

    let s = rig.step_frozen(&throttle(0.2), &fb);
    assert_eq!(s.launch, LaunchState::Cooldown);
    assert!(!rig.pt.launch_active());
}

#[test]
fn both_pedals_at_standstill_burn_out() {
    let mut rig = Rig::with_defaults();
    let fb = rolling(0.0);
    let both = DriverInput {
        throttle: 1.0,
        brake: 1.0,
        ..DriverInput::default()
    };

    let samples: Vec<_> = (0..ticks(0.5)).map(|_| rig.step_frozen(&both, &fb)).collect();

    assert!(samples.iter().all(|s| s.mode == DriveMode::Burnout));
    let last = samples.last().unwrap();
    assert!(last.out.front_hold_brake > 0.0);
    assert!(last.out.total_motor_torque() > 0.0);
    // Only the front axle is held; the brake pedal never reaches the driven wheels.
    assert!(samples.iter().all(|s| s.out.service_brake == 0.0));
    assert!(last.out.driven.iter().all(|w| w.brake_torque == 0.0));
    // The brake pedal does not latch reverse during a burnout.
    assert_eq!(rig.pt.gear_index(), FIRST_FORWARD_GEAR);
    assert!(rig.gear_changes().is_empty());
}
