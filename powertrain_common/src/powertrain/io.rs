//! Per-tick inputs and outputs of the powertrain core.
//!
//! [`DriverInput`] comes from the input provider, [`WheelFeedback`] from the
//! wheel/body model. [`DriveOutput`] is written back to the wheel model once
//! per tick.

use serde::{Deserialize, Serialize};

use super::flags::TorqueCut;
use super::state::DriveMode;

// ─── Inputs ─────────────────────────────────────────────────────────

/// Driver intent for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DriverInput {
    /// Normalized throttle [0, 1].
    pub throttle: f64,
    /// Normalized brake [0, 1].
    pub brake: f64,
    /// Handbrake held.
    pub handbrake: bool,
    /// Shift-up edge pulse (true on the tick the button was pressed).
    pub shift_up: bool,
    /// Shift-down edge pulse.
    pub shift_down: bool,
    /// Engine start/stop edge pulse.
    pub engine_toggle: bool,
    /// Steering [-1, 1]; carried for collaborators, unused by the core.
    pub steering: f64,
}

impl DriverInput {
    /// Pedal values clamped into [0, 1]; non-finite values read as released.
    pub fn sanitized(&self) -> Self {
        Self {
            throttle: unit(self.throttle),
            brake: unit(self.brake),
            steering: if self.steering.is_finite() {
                self.steering.clamp(-1.0, 1.0)
            } else {
                0.0
            },
            ..*self
        }
    }
}

/// Readings from the wheel/body model, taken at the start of a tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WheelFeedback {
    /// Angular speed of each driven wheel [RPM], signed (positive = forward).
    pub driven_wheel_rpm: [f64; 2],
    /// Vehicle longitudinal speed [m/s], signed (positive = forward).
    pub longitudinal_speed: f64,
    /// Vehicle lateral speed [m/s].
    pub lateral_speed: f64,
    /// Wheel radius [m].
    pub wheel_radius: f64,
    /// True if at least one driven wheel touches the ground.
    pub grounded: bool,
}

impl Default for WheelFeedback {
    fn default() -> Self {
        Self {
            driven_wheel_rpm: [0.0; 2],
            longitudinal_speed: 0.0,
            lateral_speed: 0.0,
            wheel_radius: 0.33,
            grounded: true,
        }
    }
}

impl WheelFeedback {
    /// Mean driven-wheel speed [RPM]; non-finite readings count as zero.
    pub fn mean_wheel_rpm(&self) -> f64 {
        let [l, r] = self.driven_wheel_rpm;
        (finite_or_zero(l) + finite_or_zero(r)) * 0.5
    }

    /// Longitudinal speed [m/s]; non-finite readings count as zero.
    #[inline]
    pub fn speed(&self) -> f64 {
        finite_or_zero(self.longitudinal_speed)
    }
}

// ─── Outputs ────────────────────────────────────────────────────────

/// Torque command for one driven wheel.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WheelCommand {
    /// Motor torque [Nm], signed (positive = forward rotation).
    pub motor_torque: f64,
    /// Additive brake torque [Nm], magnitude (≥ 0), opposing rotation.
    pub brake_torque: f64,
}

/// Everything the core writes back to the wheel model, plus tick telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DriveOutput {
    /// Left and right driven wheels.
    pub driven: [WheelCommand; 2],
    /// Holding brake on the non-driven axle [Nm] (burnout), per wheel.
    pub front_hold_brake: f64,
    /// Signed engine-braking torque per driven wheel [Nm] (opposes motion).
    pub engine_braking: f64,
    /// Service-brake pedal [0, 1] after the reverse pedal swap; 0 in burnout.
    pub service_brake: f64,
    /// Mode selected this tick.
    pub mode: DriveMode,
    /// Why drive torque was cut this tick.
    #[serde(skip)]
    pub cuts: TorqueCut,
}

impl DriveOutput {
    /// Sum of motor torque over both driven wheels [Nm].
    #[inline]
    pub fn total_motor_torque(&self) -> f64 {
        self.driven[0].motor_torque + self.driven[1].motor_torque
    }
}

#[inline]
fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() { v } else { 0.0 }
}

#[inline]
fn unit(v: f64) -> f64 {
    if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 }
}
