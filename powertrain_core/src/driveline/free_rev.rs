//! Free-revving (non-coupled) engine path.
//!
//! Engine speed chases a throttle-mapped target with a first-order lag.
//! Falling is faster than rising, and faster again when the engine is
//! unloaded or hard-cut. A stuck-high engine with the pedal lifted gets an
//! extra linear decay, and a nearly locked clutch nudges the engine toward
//! the mechanically implied RPM.

use core::f64::consts::TAU;

use powertrain_common::consts::{MIN_DIVISOR, RAD_S_TO_RPM};
use powertrain_common::powertrain::config::{DrivelineConfig, EngineConfig};

use crate::control::filters::{approach, lerp, ramp};

/// Band above idle over which roughness fades out [RPM].
const ROUGHNESS_FADE_RPM: f64 = 500.0;

/// Throttle-mapped free-rev target RPM.
///
/// `launch_rpm` raises the floor while launch control is active. Near idle
/// a small ripple at `roughness_hz` is superimposed; `now` is the
/// simulation clock.
pub fn target_rpm(throttle: f64, launch_rpm: Option<f64>, now: f64, engine: &EngineConfig) -> f64 {
    let mut target = lerp(engine.idle_rpm, engine.max_rpm, throttle);
    if let Some(launch) = launch_rpm {
        target = target.max(launch);
    }
    let near_idle = 1.0 - ramp(target, engine.idle_rpm, engine.idle_rpm + ROUGHNESS_FADE_RPM);
    target + engine.roughness_rpm * near_idle * (TAU * engine.roughness_hz * now).sin()
}

/// Per-tick inputs to [`step`].
#[derive(Debug, Clone, Copy)]
pub struct FreeRevInputs {
    pub rpm: f64,
    pub target: f64,
    pub pedal_up: bool,
    /// Neutral or clutch essentially open.
    pub unloaded: bool,
    pub hard_cut: bool,
    /// Negative torque injected by the hard cut [Nm].
    pub cut_torque: f64,
    /// Mechanically implied RPM when the band lock applies.
    pub band_lock_rpm: Option<f64>,
}

/// Advance engine RPM one tick along the free-rev path.
pub fn step(inp: &FreeRevInputs, dt: f64, engine: &EngineConfig, driveline: &DrivelineConfig) -> f64 {
    let tau = if inp.target >= inp.rpm {
        engine.tau_rise
    } else if inp.unloaded || inp.hard_cut {
        engine.tau_fall * 0.5
    } else {
        engine.tau_fall
    };
    let mut rpm = approach(inp.rpm, inp.target, tau, dt);

    if inp.pedal_up && rpm > inp.target + engine.anti_hang_margin {
        rpm = (rpm - engine.anti_hang_rate * dt).max(inp.target);
    }
    if inp.cut_torque > 0.0 {
        rpm -= inp.cut_torque / engine.inertia.max(MIN_DIVISOR) * dt * RAD_S_TO_RPM;
    }
    if let Some(mech) = inp.band_lock_rpm {
        rpm = approach(rpm, mech, driveline.band_lock_tau, dt);
    }
    rpm
}
