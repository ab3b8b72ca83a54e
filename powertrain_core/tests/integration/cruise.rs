//! Integration test: top-gear cruise in manual mode, then a pedal lift.

use powertrain_common::powertrain::state::{DriveMode, ShiftMode};

use powertrain_core::gearbox::ShiftTransition;
use powertrain_core::sim::{BodyConfig, LongitudinalBody};

use super::harness::{Rig, throttle};

fn cruising_in_top() -> Rig {
    let mut rig = Rig::with_defaults();
    rig.body = LongitudinalBody::new(BodyConfig::default()).with_speed(30.0);
    rig.pt.set_shift_mode(ShiftMode::Manual);
    let top = rig.pt.table().top_gear();
    assert_eq!(rig.pt.engage_gear_immediate(top), ShiftTransition::Engaged(top));
    rig
}

#[test]
fn part_throttle_cruise_drives_through_the_clutch() {
    let mut rig = cruising_in_top();
    let samples = rig.run(3.0, &throttle(0.3));

    let last = samples.last().unwrap();
    assert_eq!(last.mode, DriveMode::Coupled);
    assert_eq!(last.gear, rig.pt.table().top_gear());
    assert!(last.out.total_motor_torque() > 0.0);
    assert_eq!(last.out.engine_braking, 0.0);
    // Engine is locked to the wheels.
    let mech = rig.pt.table().mechanical_rpm(last.gear, rig.body.wheel_rpm());
    assert!((last.rpm - mech).abs() < 300.0, "rpm {} vs {}", last.rpm, mech);
}

#[test]
fn pedal_lift_cuts_drive_and_engine_brakes() {
    let mut rig = cruising_in_top();
    rig.run(3.0, &throttle(0.3));
    let speed_at_lift = rig.body.speed();

    let coast = rig.run(2.0, &throttle(0.0));

    for s in &coast {
        assert_eq!(s.out.total_motor_torque(), 0.0);
    }
    let last = coast.last().unwrap();
    assert!(last.out.engine_braking < 0.0);
    assert!(last.out.driven.iter().all(|w| w.brake_torque > 0.0));
    assert!(rig.body.speed() < speed_at_lift);
    // Engine braking eases off as the coasting engine slows.
    let first = coast.first().unwrap();
    assert!(last.rpm < first.rpm);
    assert!(last.out.engine_braking.abs() <= first.out.engine_braking.abs() + 1e-9);
    for pair in coast.windows(2) {
        if pair[1].rpm <= pair[0].rpm {
            assert!(
                pair[1].out.engine_braking.abs() <= pair[0].out.engine_braking.abs() + 1e-9,
                "braking grew from {} to {} while rpm fell from {} to {}",
                pair[0].out.engine_braking,
                pair[1].out.engine_braking,
                pair[0].rpm,
                pair[1].rpm
            );
        }
    }
    // Manual mode: no auto downshift while coasting.
    assert_eq!(rig.pt.gear_index(), rig.pt.table().top_gear());
    assert!(rig.gear_changes().iter().all(|&(_, to)| to == rig.pt.table().top_gear()));
}
