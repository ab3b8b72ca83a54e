//! Integration test: gear changes under the automatic policy and manual
//! pulses.

use powertrain_common::consts::{FIRST_FORWARD_GEAR, NEUTRAL_GEAR, REVERSE_GEAR};
use powertrain_common::powertrain::config::PowertrainConfig;
use powertrain_common::powertrain::io::DriverInput;
use powertrain_common::powertrain::state::{EngineRunState, ShiftMode};

use powertrain_core::gearbox::ShiftTransition;

use super::harness::{DT, Rig, rolling, throttle};

fn neutral_start() -> PowertrainConfig {
    let mut cfg = PowertrainConfig::default();
    cfg.gearbox.initial_gear = NEUTRAL_GEAR;
    cfg
}

// ── Neutral → first ─────────────────────────────────────────────────

#[test]
fn throttle_pulls_neutral_into_first_exactly_once() {
    let mut rig = Rig::new(neutral_start());
    assert_eq!(rig.pt.gear_index(), NEUTRAL_GEAR);

    let idle = rig.pt.engine_rpm();
    let samples = rig.run(1.0, &throttle(0.8));

    assert_eq!(rig.gear_changes(), vec![(NEUTRAL_GEAR, FIRST_FORWARD_GEAR)]);
    let peak = samples.iter().map(|s| s.rpm).fold(0.0, f64::max);
    assert!(peak > idle + 500.0, "peak rpm {peak}");
    // Torque is cut for the whole shift.
    assert!(samples.iter().any(|s| s.shifting));
    for s in samples.iter().filter(|s| s.shifting) {
        assert_eq!(s.out.total_motor_torque(), 0.0);
    }
    // After the shift and its cut tail the car drives off.
    let last = samples.last().unwrap();
    assert!(!last.shifting);
    assert!(last.out.total_motor_torque() > 0.0);
    assert!(rig.body.speed() > 0.0);
}

#[test]
fn resting_foot_does_not_leave_neutral() {
    let mut rig = Rig::new(neutral_start());
    rig.run(1.0, &throttle(0.02));
    assert_eq!(rig.pt.gear_index(), NEUTRAL_GEAR);
    assert!(rig.gear_changes().is_empty());
}

#[test]
fn neutral_never_drives() {
    let mut rig = Rig::with_defaults();
    rig.pt.set_shift_mode(ShiftMode::Manual);
    rig.pt.engage_gear_immediate(NEUTRAL_GEAR);

    for s in rig.run(2.0, &throttle(1.0)) {
        assert_eq!(s.gear, NEUTRAL_GEAR);
        assert_eq!(s.out.total_motor_torque(), 0.0);
    }
    assert_eq!(rig.body.speed(), 0.0);
}

#[test]
fn requesting_the_current_gear_is_a_no_op() {
    let mut rig = Rig::with_defaults();
    rig.run(0.5, &throttle(0.3));
    rig.events.clear();
    let before = rig.pt.telemetry();

    let result = rig.pt.request_gear(FIRST_FORWARD_GEAR);

    assert!(matches!(result, ShiftTransition::Rejected(_)));
    assert!(!result.is_accepted());
    assert!(!rig.pt.is_shifting());
    assert!(rig.pt.drain_events().is_empty());
    assert_eq!(rig.pt.telemetry(), before);
}

// ── Automatic upshifts ──────────────────────────────────────────────

#[test]
fn full_throttle_upshifts_in_sequence() {
    let mut rig = Rig::with_defaults();
    let samples = rig.run(12.0, &throttle(1.0));

    let changes = rig.gear_changes();
    assert!(!changes.is_empty());
    for (from, to) in &changes {
        assert_eq!(*to, from + 1, "unexpected shift {from} -> {to}");
    }
    assert!(rig.pt.gear_index() >= FIRST_FORWARD_GEAR + 2);

    for s in samples.iter().filter(|s| s.shifting) {
        assert_eq!(s.out.total_motor_torque(), 0.0);
    }
}

#[test]
fn clutch_stays_bounded_and_slew_limited() {
    let cfg = PowertrainConfig::default();
    let max_rate = cfg.gearbox.clutch_slew_rate.max(cfg.gearbox.clutch_relax_rate);
    let mut rig = Rig::new(cfg);

    let mut prev = rig.pt.clutch();
    for s in rig.run(8.0, &throttle(1.0)) {
        assert!((0.0..=1.0).contains(&s.clutch));
        assert!((s.clutch - prev).abs() <= max_rate * DT + 1e-9);
        prev = s.clutch;
    }
}

#[test]
fn rpm_stays_inside_running_band() {
    let cfg = PowertrainConfig::default();
    let low = cfg.engine.idle_rpm;
    let high = cfg.engine.rev_limiter_rpm + cfg.engine.rpm_margin;
    let mut rig = Rig::new(cfg);

    let mut samples = rig.run(6.0, &throttle(1.0));
    samples.extend(rig.run(3.0, &throttle(0.0)));
    for s in samples.iter().filter(|s| s.run_state == EngineRunState::Running) {
        assert!(s.rpm >= low - 1e-9 && s.rpm <= high + 1e-9, "rpm {}", s.rpm);
    }
}

// ── Manual pulses ───────────────────────────────────────────────────

#[test]
fn manual_downshift_from_first_goes_to_neutral_when_moving() {
    let mut rig = Rig::with_defaults();
    rig.pt.set_shift_mode(ShiftMode::Manual);
    let pulse = DriverInput {
        shift_down: true,
        ..DriverInput::default()
    };

    rig.step_frozen(&pulse, &rolling(5.0));

    assert_eq!(rig.pt.gear_index(), NEUTRAL_GEAR);
    assert!(rig.pt.is_shifting());
    assert_eq!(rig.gear_changes(), vec![(FIRST_FORWARD_GEAR, NEUTRAL_GEAR)]);
}

#[test]
fn manual_downshift_from_first_engages_reverse_when_stopped() {
    let mut rig = Rig::with_defaults();
    rig.pt.set_shift_mode(ShiftMode::Manual);
    let pulse = DriverInput {
        shift_down: true,
        ..DriverInput::default()
    };

    rig.step_frozen(&pulse, &rolling(0.0));

    assert_eq!(rig.pt.gear_index(), REVERSE_GEAR);
    assert!(rig.pt.is_reverse());
    assert!(!rig.pt.is_shifting());
}

#[test]
fn manual_upshift_pulse_is_ignored_mid_shift() {
    let mut rig = Rig::with_defaults();
    rig.pt.set_shift_mode(ShiftMode::Manual);
    let up = DriverInput {
        shift_up: true,
        ..DriverInput::default()
    };

    rig.step_frozen(&up, &rolling(8.0));
    assert_eq!(rig.pt.gear_index(), FIRST_FORWARD_GEAR + 1);
    rig.step_frozen(&up, &rolling(8.0));
    assert_eq!(rig.pt.gear_index(), FIRST_FORWARD_GEAR + 1);
    assert_eq!(rig.gear_changes().len(), 1);
}

// ── Determinism ─────────────────────────────────────────────────────

#[test]
fn identical_inputs_give_identical_runs() {
    let mut a = Rig::with_defaults();
    let mut b = Rig::with_defaults();
    let ra = a.run(4.0, &throttle(0.8));
    let rb = b.run(4.0, &throttle(0.8));
    for (x, y) in ra.iter().zip(&rb) {
        assert_eq!(x.out, y.out);
        assert_eq!(x.rpm, y.rpm);
        assert_eq!(x.gear, y.gear);
    }
    assert_eq!(a.pt.telemetry(), b.pt.telemetry());
}

#[test]
fn zero_dt_changes_nothing() {
    let mut rig = Rig::with_defaults();
    rig.run(1.0, &throttle(0.6));
    let before = rig.pt.telemetry();

    for _ in 0..10 {
        let out = rig.pt.tick(0.0, &throttle(1.0), &rig.body.feedback());
        assert_eq!(out.total_motor_torque(), 0.0);
    }

    assert_eq!(rig.pt.telemetry(), before);
    assert_eq!(rig.pt.stats().skipped, 10);
}
