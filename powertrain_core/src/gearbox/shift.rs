//! Shift execution: clutch trajectory and torque-cut windows.
//!
//! A timed shift opens the clutch linearly over the first half of the shift
//! and closes it over the second half. Cut windows are absolute expiry times
//! on the simulation clock; a window is open while `now < until`.

use powertrain_common::powertrain::config::GearboxConfig;

use crate::control::filters::lerp;

// ─── Clutch Trajectory ──────────────────────────────────────────────

/// Clutch engagement for shift fraction `t` ∈ [0, 1].
///
/// ```text
/// t ∈ [0, 0.5)  → 1 → 0
/// t ∈ [0.5, 1]  → 0 → 1
/// ```
#[inline]
pub fn clutch_trajectory(t: f64) -> f64 {
    if t < 0.5 {
        lerp(1.0, 0.0, t / 0.5)
    } else {
        lerp(0.0, 1.0, (t - 0.5) / 0.5)
    }
}

// ─── Shift Process ──────────────────────────────────────────────────

/// An in-flight timed shift.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShiftProcess {
    active: bool,
    /// Elapsed time within the shift [s].
    timer: f64,
    duration: f64,
    from: u8,
    to: u8,
}

impl ShiftProcess {
    #[inline]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    #[inline]
    pub const fn from(&self) -> u8 {
        self.from
    }

    #[inline]
    pub const fn to(&self) -> u8 {
        self.to
    }

    /// Start a shift; resets the timer.
    pub fn start(&mut self, from: u8, to: u8, duration: f64) {
        *self = Self {
            active: true,
            timer: 0.0,
            duration,
            from,
            to,
        };
    }

    /// Abandon the shift (instant engagement took over).
    #[inline]
    pub fn cancel(&mut self) {
        self.active = false;
    }

    /// Progress through the shift, 0 when idle.
    #[inline]
    pub fn fraction(&self) -> f64 {
        if !self.active || self.duration <= 0.0 {
            return 0.0;
        }
        (self.timer / self.duration).clamp(0.0, 1.0)
    }

    /// Clutch value the shift currently asks for (1 when idle).
    #[inline]
    pub fn clutch_target(&self) -> f64 {
        if self.active {
            clutch_trajectory(self.fraction())
        } else {
            1.0
        }
    }

    /// Advance the timer. Returns true on the tick the shift completes.
    pub fn advance(&mut self, dt: f64) -> bool {
        if !self.active {
            return false;
        }
        self.timer = (self.timer + dt).min(self.duration);
        if self.timer >= self.duration {
            self.active = false;
            return true;
        }
        false
    }
}

// ─── Torque-Cut Windows ─────────────────────────────────────────────

/// Shift and pedal-lift cut windows plus the lift detector.
#[derive(Debug, Clone, Copy)]
pub struct CutWindows {
    /// Shift cut expiry on the simulation clock [s].
    torque_cut_until: f64,
    /// Lift cut expiry on the simulation clock [s].
    lift_cut_until: f64,
    /// Throttle has been above `lift_high` since the last lift.
    lift_armed: bool,
}

impl Default for CutWindows {
    fn default() -> Self {
        Self {
            torque_cut_until: f64::NEG_INFINITY,
            lift_cut_until: f64::NEG_INFINITY,
            lift_armed: false,
        }
    }
}

impl CutWindows {
    /// Open (or extend) the shift cut window.
    pub fn open_shift(&mut self, now: f64, length: f64) {
        self.torque_cut_until = self.torque_cut_until.max(now + length);
    }

    #[inline]
    pub fn shift_cut_active(&self, now: f64) -> bool {
        now < self.torque_cut_until
    }

    #[inline]
    pub fn lift_cut_active(&self, now: f64) -> bool {
        now < self.lift_cut_until
    }

    /// Watch the throttle for a lift and open the lift window on one.
    ///
    /// Returns true on the tick a lift is detected.
    pub fn observe_pedal(&mut self, throttle: f64, now: f64, cfg: &GearboxConfig) -> bool {
        if throttle > cfg.lift_high {
            self.lift_armed = true;
            return false;
        }
        if self.lift_armed && throttle < cfg.lift_low {
            self.lift_armed = false;
            self.lift_cut_until = now + cfg.lift_cut_duration;
            return true;
        }
        false
    }

    /// Drop expired windows.
    pub fn clear_expired(&mut self, now: f64) {
        if !self.shift_cut_active(now) {
            self.torque_cut_until = f64::NEG_INFINITY;
        }
        if !self.lift_cut_active(now) {
            self.lift_cut_until = f64::NEG_INFINITY;
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
