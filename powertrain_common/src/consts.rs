//! Workspace-wide constants for the powertrain core.
//!
//! Single source of truth for gear indices, table capacities and unit
//! conversions. Imported by both crates; never duplicated.

use static_assertions::const_assert;

/// Gear table index of Reverse.
pub const REVERSE_GEAR: u8 = 0;

/// Gear table index of Neutral.
pub const NEUTRAL_GEAR: u8 = 1;

/// Gear table index of the first forward gear.
pub const FIRST_FORWARD_GEAR: u8 = 2;

/// Maximum number of entries in a gear table (Reverse + Neutral + 8 forward).
pub const MAX_GEARS: usize = 10;

/// Maximum number of control points in a torque curve.
pub const MAX_TORQUE_POINTS: usize = 24;

/// Maximum number of outward events buffered between two drains.
pub const MAX_PENDING_EVENTS: usize = 16;

/// Conversion factor RPM → rad/s.
pub const RPM_TO_RAD_S: f64 = core::f64::consts::TAU / 60.0;

/// Conversion factor rad/s → RPM.
pub const RAD_S_TO_RPM: f64 = 60.0 / core::f64::consts::TAU;

/// Smallest magnitude used as a divisor (ratios, radii, time constants).
pub const MIN_DIVISOR: f64 = 1e-6;

/// Default fixed simulation step [s] (250 Hz).
pub const DEFAULT_STEP_S: f64 = 1.0 / 250.0;

// A table must hold Reverse, Neutral and at least one forward gear.
const_assert!((FIRST_FORWARD_GEAR as usize) < MAX_GEARS);
const_assert!(REVERSE_GEAR < NEUTRAL_GEAR && NEUTRAL_GEAR < FIRST_FORWARD_GEAR);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constants_are_consistent() {
        assert!(MAX_TORQUE_POINTS >= 2);
        assert!(MAX_PENDING_EVENTS > 0);
        assert!(DEFAULT_STEP_S > 0.0);
    }

    #[test]
    fn rpm_conversion_round_trips() {
        let rpm = 3000.0;
        assert!((rpm * RPM_TO_RAD_S * RAD_S_TO_RPM - rpm).abs() < 1e-9);
        assert!((1000.0 * RPM_TO_RAD_S - 104.719_755).abs() < 1e-5);
    }
}
