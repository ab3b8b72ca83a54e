//! Minimal longitudinal vehicle body.
//!
//! A point mass on rigid (non-slipping) wheels: integrates drive torque,
//! brakes, aerodynamic drag and rolling resistance, and reports the wheel
//! speed the core reads on the next tick. Used by the scenario runner and
//! the integration tests in place of a full wheel/tire model.

use core::f64::consts::TAU;

use serde::{Deserialize, Serialize};

use powertrain_common::consts::MIN_DIVISOR;
use powertrain_common::powertrain::io::{DriveOutput, WheelFeedback};

const GRAVITY: f64 = 9.81;

/// Body tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BodyConfig {
    /// Vehicle mass [kg].
    pub mass: f64,
    /// Wheel radius [m].
    pub wheel_radius: f64,
    /// Aerodynamic drag factor ½·ρ·Cd·A [kg/m].
    pub drag_factor: f64,
    /// Rolling-resistance coefficient.
    pub rolling_resistance: f64,
    /// Service-brake torque per wheel at full pedal [Nm].
    pub max_brake_torque: f64,
    /// Wheels on the car (all braked).
    pub wheel_count: u8,
}

impl Default for BodyConfig {
    fn default() -> Self {
        Self {
            mass: 1400.0,
            wheel_radius: 0.33,
            drag_factor: 0.4,
            rolling_resistance: 0.012,
            max_brake_torque: 1500.0,
            wheel_count: 4,
        }
    }
}

/// Point-mass longitudinal body.
#[derive(Debug, Clone)]
pub struct LongitudinalBody {
    config: BodyConfig,
    /// Signed longitudinal speed [m/s].
    speed: f64,
    /// Distance travelled [m].
    distance: f64,
}

impl LongitudinalBody {
    pub fn new(config: BodyConfig) -> Self {
        Self {
            config,
            speed: 0.0,
            distance: 0.0,
        }
    }

    /// Start at a given signed speed, e.g. for cruise scenarios.
    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = speed;
        self
    }

    #[inline]
    pub const fn speed(&self) -> f64 {
        self.speed
    }

    #[inline]
    pub const fn distance(&self) -> f64 {
        self.distance
    }

    /// Wheel angular speed implied by the body speed [RPM].
    #[inline]
    pub fn wheel_rpm(&self) -> f64 {
        self.speed / (TAU * self.config.wheel_radius.max(MIN_DIVISOR)) * 60.0
    }

    /// Readings for the next powertrain tick.
    pub fn feedback(&self) -> WheelFeedback {
        let w = self.wheel_rpm();
        WheelFeedback {
            driven_wheel_rpm: [w, w],
            longitudinal_speed: self.speed,
            lateral_speed: 0.0,
            wheel_radius: self.config.wheel_radius,
            grounded: true,
        }
    }

    /// Integrate one step under the powertrain's command.
    pub fn step(&mut self, out: &DriveOutput, dt: f64) {
        if dt <= 0.0 {
            return;
        }
        let cfg = &self.config;
        let r = cfg.wheel_radius.max(MIN_DIVISOR);
        let mass = cfg.mass.max(MIN_DIVISOR);

        let drive = out.total_motor_torque() / r;
        let brake_torque = out.service_brake * cfg.max_brake_torque * f64::from(cfg.wheel_count)
            + out.driven.iter().map(|w| w.brake_torque).sum::<f64>()
            + out.front_hold_brake * 2.0;
        // Everything that only ever opposes motion, as a magnitude [N].
        let opposing = brake_torque / r
            + cfg.drag_factor * self.speed * self.speed
            + cfg.rolling_resistance * mass * GRAVITY;

        let driven = self.speed + drive / mass * dt;
        let slowdown = opposing / mass * dt;
        // Opposing forces can stop the car but never push it backwards.
        self.speed = if driven.abs() <= slowdown {
            0.0
        } else {
            driven - slowdown * driven.signum()
        };
        self.distance += self.speed * dt;
    }
}

#[cfg(test)]
mod tests {
    use powertrain_common::powertrain::io::WheelCommand;

    use super::*;

    const DT: f64 = 0.01;

    fn drive(torque_per_wheel: f64) -> DriveOutput {
        DriveOutput {
            driven: [WheelCommand {
                motor_torque: torque_per_wheel,
                brake_torque: 0.0,
            }; 2],
            ..DriveOutput::default()
        }
    }

    #[test]
    fn torque_accelerates_and_feedback_matches() {
        let mut body = LongitudinalBody::new(BodyConfig::default());
        for _ in 0..100 {
            body.step(&drive(500.0), DT);
        }
        assert!(body.speed() > 0.0);
        let fb = body.feedback();
        let expected = body.speed() / (TAU * 0.33) * 60.0;
        assert!((fb.mean_wheel_rpm() - expected).abs() < 1e-9);
    }

    #[test]
    fn brakes_stop_without_reversing() {
        let mut body = LongitudinalBody::new(BodyConfig::default()).with_speed(5.0);
        let braking = DriveOutput {
            service_brake: 1.0,
            ..DriveOutput::default()
        };
        for _ in 0..500 {
            body.step(&braking, DT);
            assert!(body.speed() >= 0.0);
        }
        assert_eq!(body.speed(), 0.0);
    }

    #[test]
    fn coasting_slows_down() {
        let mut body = LongitudinalBody::new(BodyConfig::default()).with_speed(30.0);
        body.step(&DriveOutput::default(), DT);
        assert!(body.speed() < 30.0);
    }
}
