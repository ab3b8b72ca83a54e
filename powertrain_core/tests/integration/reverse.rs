//! Integration test: automatic reverse from the brake pedal, then back to
//! first once stopped.

use powertrain_common::consts::REVERSE_GEAR;

use super::harness::{Rig, brake, throttle};

#[test]
fn brake_drives_in_reverse_and_throttle_stops_then_drives_forward() {
    let mut rig = Rig::with_defaults();

    let backing = rig.run(3.0, &brake(0.8));
    assert_eq!(rig.pt.gear_index(), REVERSE_GEAR);
    assert!(rig.pt.gear_label().as_char() == 'R');
    assert!(backing.iter().all(|s| s.out.service_brake == 0.0));
    assert!(rig.body.speed() < -1.0, "speed {}", rig.body.speed());

    let after = rig.run(6.0, &throttle(0.6));
    // The throttle pedal is the service brake while still in reverse.
    assert!(after.iter().any(|s| s.gear == REVERSE_GEAR && s.out.service_brake > 0.5));
    assert!(rig.pt.table().is_forward(rig.pt.gear_index()));
    assert!(rig.body.speed() > 0.0);
    assert_eq!(rig.gear_changes().first().map(|c| c.1), Some(REVERSE_GEAR));
}
