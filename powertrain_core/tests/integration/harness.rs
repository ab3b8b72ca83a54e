//! Shared test rig: a powertrain plus the body it drives.

#![allow(dead_code)]

use powertrain_common::powertrain::config::PowertrainConfig;
use powertrain_common::powertrain::events::PowertrainEvent;
use powertrain_common::powertrain::io::{DriveOutput, DriverInput, WheelFeedback};
use powertrain_common::powertrain::state::{DriveMode, EngineRunState, LaunchState};

use powertrain_core::Powertrain;
use powertrain_core::sim::{BodyConfig, LongitudinalBody};

pub const DT: f64 = 1.0 / 250.0;

/// What one tick left behind.
#[derive(Debug, Clone, Copy)]
pub struct Sample {
    pub out: DriveOutput,
    pub gear: u8,
    pub shifting: bool,
    pub clutch: f64,
    pub rpm: f64,
    pub run_state: EngineRunState,
    pub mode: DriveMode,
    pub launch: LaunchState,
    pub speed: f64,
}

pub struct Rig {
    pub pt: Powertrain,
    pub body: LongitudinalBody,
    pub events: Vec<PowertrainEvent>,
}

impl Rig {
    pub fn new(config: PowertrainConfig) -> Self {
        Self {
            pt: Powertrain::new(config),
            body: LongitudinalBody::new(BodyConfig::default()),
            events: Vec::new(),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(PowertrainConfig::default())
    }

    /// One closed-loop tick: the body reacts to the command.
    pub fn step(&mut self, input: &DriverInput) -> Sample {
        let out = self.pt.tick(DT, input, &self.body.feedback());
        self.body.step(&out, DT);
        self.record(out)
    }

    /// One tick against fixed wheel feedback; the body is not moved.
    pub fn step_frozen(&mut self, input: &DriverInput, fb: &WheelFeedback) -> Sample {
        let out = self.pt.tick(DT, input, fb);
        self.record(out)
    }

    /// Closed-loop ticks for `seconds` with a constant input.
    pub fn run(&mut self, seconds: f64, input: &DriverInput) -> Vec<Sample> {
        (0..ticks(seconds)).map(|_| self.step(input)).collect()
    }

    /// All GearChanged events seen so far as (from, to).
    pub fn gear_changes(&self) -> Vec<(u8, u8)> {
        self.events
            .iter()
            .filter_map(|e| match *e {
                PowertrainEvent::GearChanged { from, to } => Some((from, to)),
                _ => None,
            })
            .collect()
    }

    fn record(&mut self, out: DriveOutput) -> Sample {
        self.events.extend(self.pt.drain_events());
        Sample {
            out,
            gear: self.pt.gear_index(),
            shifting: self.pt.is_shifting(),
            clutch: self.pt.clutch(),
            rpm: self.pt.engine_rpm(),
            run_state: self.pt.run_state(),
            mode: self.pt.drive_mode(),
            launch: self.pt.telemetry().launch,
            speed: self.body.speed(),
        }
    }
}

pub fn ticks(seconds: f64) -> usize {
    (seconds / DT).round() as usize
}

pub fn throttle(value: f64) -> DriverInput {
    DriverInput {
        throttle: value,
        ..DriverInput::default()
    }
}

pub fn brake(value: f64) -> DriverInput {
    DriverInput {
        brake: value,
        ..DriverInput::default()
    }
}

/// Wheel feedback for a car rolling at `speed` [m/s] on 0.33 m wheels.
pub fn rolling(speed: f64) -> WheelFeedback {
    let rpm = speed / (core::f64::consts::TAU * 0.33) * 60.0;
    WheelFeedback {
        driven_wheel_rpm: [rpm, rpm],
        longitudinal_speed: speed,
        ..WheelFeedback::default()
    }
}
