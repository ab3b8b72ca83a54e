//! Automatic shift decisions while moving.
//!
//! Conditions must hold continuously for `hold_time` before a shift is
//! committed. Nothing is evaluated during a shift or inside the dwell and
//! minimum-interval windows, except the emergency upshift near redline.

use powertrain_common::consts::FIRST_FORWARD_GEAR;
use powertrain_common::powertrain::config::ShiftPolicyConfig;

use super::table::GearTable;

/// Per-tick inputs to the shift policy.
#[derive(Debug, Clone, Copy)]
pub struct PolicyInputs {
    pub gear: u8,
    pub throttle: f64,
    /// Signed mean driven-wheel RPM.
    pub wheel_rpm: f64,
    pub engine_rpm: f64,
    /// Time since the last shift completed [s].
    pub since_shift_end: f64,
    /// Time since the last shift started [s].
    pub since_shift_start: f64,
    pub shifting: bool,
}

/// What the policy wants this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShiftDecision {
    Upshift(u8),
    Downshift(u8),
    /// Near-redline upshift that skipped hold, dwell and interval.
    EmergencyUpshift(u8),
}

impl ShiftDecision {
    #[inline]
    pub const fn target(self) -> u8 {
        match self {
            Self::Upshift(g) | Self::Downshift(g) | Self::EmergencyUpshift(g) => g,
        }
    }
}

/// Hysteresis timers for the up/down conditions.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoShiftPolicy {
    up_hold: f64,
    down_hold: f64,
}

impl AutoShiftPolicy {
    #[inline]
    pub fn reset(&mut self) {
        self.up_hold = 0.0;
        self.down_hold = 0.0;
    }

    pub fn evaluate(
        &mut self,
        inp: &PolicyInputs,
        table: &GearTable,
        cfg: &ShiftPolicyConfig,
        dt: f64,
    ) -> Option<ShiftDecision> {
        if inp.shifting || !table.is_forward(inp.gear) {
            self.reset();
            return None;
        }

        let top = table.top_gear();
        if inp.engine_rpm >= cfg.emergency_rpm && inp.gear < top {
            self.reset();
            return Some(ShiftDecision::EmergencyUpshift(inp.gear + 1));
        }

        if inp.since_shift_end < cfg.dwell_time || inp.since_shift_start < cfg.min_shift_interval {
            self.reset();
            return None;
        }

        let mech = table.mechanical_rpm(inp.gear, inp.wheel_rpm).abs();
        let current = table.ratio(inp.gear);
        // Predicted RPM after a shift to `g` at unchanged wheel speed.
        let predicted = |g: u8| mech * table.ratio(g) / current;

        let up_ok = inp.gear < top
            && mech >= cfg.upshift_rpm
            && predicted(inp.gear + 1) >= cfg.downshift_rpm * cfg.next_gear_margin
            && inp.throttle >= cfg.upshift_min_throttle;

        let down_ok = inp.gear > FIRST_FORWARD_GEAR
            && mech < cfg.downshift_rpm
            && (inp.throttle >= cfg.kickdown_throttle || mech < cfg.downshift_rpm * cfg.lug_factor)
            && predicted(inp.gear - 1) < cfg.upshift_rpm;

        self.up_hold = if up_ok { self.up_hold + dt } else { 0.0 };
        self.down_hold = if down_ok { self.down_hold + dt } else { 0.0 };

        if self.up_hold >= cfg.hold_time {
            self.reset();
            Some(ShiftDecision::Upshift(inp.gear + 1))
        } else if self.down_hold >= cfg.hold_time {
            self.reset();
            Some(ShiftDecision::Downshift(inp.gear - 1))
        } else {
            None
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
