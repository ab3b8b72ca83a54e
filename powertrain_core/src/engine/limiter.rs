//! Rev limiter shaping.
//!
//! ```text
//!   torque scale
//!   1 ─────────┐ falloff      soft band
//!              └──────────┐ ┌────────┐
//!                         └─┘        └─ 0 at the limiter
//!   ────────────┬─────────────┬────────┬──────┬──► RPM
//!         falloff_start   limiter−band  limiter  ceiling (hard cut)
//! ```
//!
//! The soft band blends torque out and drag in. Reaching the ceiling fires
//! a short hard-cut pulse that zeroes torque and injects negative torque;
//! it re-arms once RPM falls `rearm_hysteresis_rpm` below the ceiling.

use powertrain_common::powertrain::config::{EngineConfig, LimiterConfig};

use crate::control::filters::{lerp, ramp};

/// Shaping applied to the engine this tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LimiterShaping {
    /// Multiplier on requested torque [0, 1].
    pub torque_scale: f64,
    /// Extra drag from the soft band [Nm].
    pub band_drag: f64,
    /// Soft-band blend [0, 1].
    pub blend: f64,
    /// Hard-cut pulse running.
    pub hard_cut: bool,
    /// Negative torque injected by the pulse [Nm] (≥ 0, applied as drag).
    pub cut_torque: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct RevLimiter {
    pulse_remaining: f64,
    armed: bool,
}

impl Default for RevLimiter {
    fn default() -> Self {
        Self {
            pulse_remaining: 0.0,
            armed: true,
        }
    }
}

impl RevLimiter {
    #[inline]
    pub fn is_cutting(&self) -> bool {
        self.pulse_remaining > 0.0
    }

    /// Soft-band blend for `rpm` without touching pulse state.
    #[inline]
    pub fn soft_blend(rpm: f64, engine: &EngineConfig, cfg: &LimiterConfig) -> f64 {
        ramp(rpm, engine.rev_limiter_rpm - cfg.soft_band_rpm, engine.rev_limiter_rpm)
    }

    /// High-RPM torque falloff for `rpm`.
    #[inline]
    pub fn falloff(rpm: f64, engine: &EngineConfig) -> f64 {
        lerp(1.0, engine.falloff_floor, ramp(rpm, engine.falloff_start_rpm, engine.rev_limiter_rpm))
    }

    /// Advance the hard-cut pulse and compute this tick's shaping.
    pub fn update(&mut self, rpm: f64, dt: f64, engine: &EngineConfig, cfg: &LimiterConfig) -> LimiterShaping {
        let ceiling = engine.rev_limiter_rpm + cfg.hard_cut_offset_rpm;

        if self.pulse_remaining > 0.0 {
            self.pulse_remaining = (self.pulse_remaining - dt).max(0.0);
        }
        if self.armed && rpm >= ceiling {
            self.armed = false;
            self.pulse_remaining = cfg.hard_cut_pulse;
            tracing::debug!(rpm, ceiling, "hard cut");
        } else if !self.armed && !self.is_cutting() && rpm < ceiling - cfg.rearm_hysteresis_rpm {
            self.armed = true;
        }

        let blend = Self::soft_blend(rpm, engine, cfg);
        let torque_scale = if rpm >= engine.rev_limiter_rpm {
            0.0
        } else {
            (1.0 - blend) * Self::falloff(rpm, engine)
        };
        let hard_cut = self.is_cutting();
        LimiterShaping {
            torque_scale: if hard_cut { 0.0 } else { torque_scale },
            band_drag: blend * cfg.band_drag,
            blend,
            hard_cut,
            cut_torque: if hard_cut { cfg.hard_cut_torque } else { 0.0 },
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
