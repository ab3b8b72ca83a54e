//! State machine enums for the powertrain core.
//!
//! All enums use `#[repr(u8)]` for a compact layout in telemetry snapshots.
//! Covers the gearbox side (ShiftMode, DirectionLatch, LaunchState), the
//! engine lifecycle (EngineRunState) and the per-tick driveline mode
//! (DriveMode).

use serde::{Deserialize, Serialize};

// ─── Gearbox ────────────────────────────────────────────────────────

/// Gear selection policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum ShiftMode {
    /// Gear chosen by the auto-shift policy and the direction latch.
    #[default]
    Automatic = 0,
    /// Gear chosen only by shift-up/shift-down pulses.
    Manual = 1,
}

/// Direction intent latched while the vehicle is near-stationary.
///
/// Only consulted in [`ShiftMode::Automatic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[repr(u8)]
pub enum DirectionLatch {
    #[default]
    Forward = 0,
    Reverse = 1,
}

/// Launch-control state (first gear only).
///
/// ```text
/// Idle → Armed → Active → Cooldown → Idle
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[repr(u8)]
pub enum LaunchState {
    /// Not engaged.
    #[default]
    Idle = 0,
    /// Arm conditions met; becomes Active next tick if they still hold.
    Armed = 1,
    /// RPM hold and ramp bypass in effect.
    Active = 2,
    /// Blocked from re-arming until the cooldown expires.
    Cooldown = 3,
}

impl LaunchState {
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Idle),
            1 => Some(Self::Armed),
            2 => Some(Self::Active),
            3 => Some(Self::Cooldown),
            _ => None,
        }
    }
}

// ─── Engine ─────────────────────────────────────────────────────────

/// Engine lifecycle: `Off → Starting → Running → Off`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[repr(u8)]
pub enum EngineRunState {
    #[default]
    Off = 0,
    /// Starter motor spinning the engine up; no torque output.
    Starting = 1,
    Running = 2,
}

impl EngineRunState {
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Off),
            1 => Some(Self::Starting),
            2 => Some(Self::Running),
            _ => None,
        }
    }

    /// Returns true if the engine can produce torque.
    #[inline]
    pub const fn is_running(self) -> bool {
        matches!(self, Self::Running)
    }
}

// ─── Driveline ──────────────────────────────────────────────────────

/// Mutually exclusive driveline mode, selected once per tick.
///
/// Priority order is the declaration order: the first mode whose
/// conditions hold wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[repr(u8)]
pub enum DriveMode {
    /// RPM decays to zero, no torque.
    #[default]
    EngineOff = 0,
    /// Timed starter ramp, no torque.
    StarterSpin = 1,
    /// Gearbox open; engine rev-matches the target gear, zero wheel torque.
    ActiveShift = 2,
    /// Front wheels held, rear wheels driven straight from the throttle map.
    Burnout = 3,
    /// Two-mass integration through the clutch.
    Coupled = 4,
    /// Engine chases a throttle-mapped target through a first-order lag.
    FreeRev = 5,
}

impl DriveMode {
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::EngineOff),
            1 => Some(Self::StarterSpin),
            2 => Some(Self::ActiveShift),
            3 => Some(Self::Burnout),
            4 => Some(Self::Coupled),
            5 => Some(Self::FreeRev),
            _ => None,
        }
    }

    /// Number of variants (sizes per-mode counters).
    pub const COUNT: usize = 6;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn launch_state_from_u8() {
        assert_eq!(LaunchState::from_u8(2), Some(LaunchState::Active));
        assert_eq!(LaunchState::from_u8(4), None);
    }

    #[test]
    fn drive_mode_covers_all_discriminants() {
        for i in 0..DriveMode::COUNT as u8 {
            assert_eq!(DriveMode::from_u8(i).map(|m| m as u8), Some(i));
        }
        assert!(DriveMode::from_u8(DriveMode::COUNT as u8).is_none());
    }

    #[test]
    fn only_running_engine_is_running() {
        assert!(EngineRunState::Running.is_running());
        assert!(!EngineRunState::Starting.is_running());
        assert!(!EngineRunState::Off.is_running());
    }

    #[test]
    fn shift_mode_deserializes_lowercase() {
        #[derive(Deserialize)]
        struct W {
            mode: ShiftMode,
        }
        let w: W = toml::from_str("mode = \"manual\"").unwrap();
        assert_eq!(w.mode, ShiftMode::Manual);
    }
}
