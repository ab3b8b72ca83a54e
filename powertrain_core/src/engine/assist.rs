//! Idle creep assist and engine braking.
//!
//! Creep lets the car roll forward in first gear on a released pedal; engine
//! braking opposes motion on a closed throttle with the clutch engaged.

use powertrain_common::powertrain::config::{AssistConfig, EngineConfig};

use crate::control::filters::ramp;

// ─── Creep ──────────────────────────────────────────────────────────

/// Conditions consulted by the creep assist.
#[derive(Debug, Clone, Copy)]
pub struct CreepConditions {
    pub running: bool,
    pub in_first: bool,
    pub throttle: f64,
    /// |longitudinal speed| [m/s].
    pub speed: f64,
}

/// Ramped creep torque state.
#[derive(Debug, Clone, Copy, Default)]
pub struct CreepAssist {
    /// Ramp-in progress [0, 1].
    level: f64,
    /// Speed fade of the last update [0, 1].
    fade: f64,
}

impl CreepAssist {
    /// Advance the ramp and return creep torque at the engine [Nm].
    ///
    /// `idle_torque` is the torque curve at idle RPM.
    pub fn update(&mut self, c: &CreepConditions, idle_torque: f64, dt: f64, cfg: &AssistConfig) -> f64 {
        let wanted = cfg.creep_enabled && c.running && c.in_first && c.throttle < cfg.creep_throttle;
        if !wanted {
            self.level = 0.0;
            self.fade = 0.0;
            return 0.0;
        }
        let step = if cfg.creep_ramp_time > 0.0 { dt / cfg.creep_ramp_time } else { 1.0 };
        self.level = (self.level + step).min(1.0);
        self.fade = 1.0 - ramp(c.speed, cfg.creep_fade_start, cfg.creep_fade_end);
        (idle_torque * cfg.creep_idle_fraction).min(cfg.creep_max_torque) * self.level * self.fade
    }

    /// Extra clutch capacity available to creep this tick [Nm].
    #[inline]
    pub fn capacity(&self, cfg: &AssistConfig) -> f64 {
        cfg.creep_capacity * self.level * self.fade
    }
}

// ─── Engine Braking ─────────────────────────────────────────────────

/// Conditions consulted by engine braking.
#[derive(Debug, Clone, Copy)]
pub struct EngineBrakeConditions {
    pub rpm: f64,
    pub throttle: f64,
    /// Signed longitudinal speed [m/s].
    pub speed: f64,
    pub in_first: bool,
    /// Ratio × final drive of the engaged gear (signed).
    pub overall_ratio: f64,
    /// Clutch engaged, in gear, not shifting, engine running.
    pub engaged: bool,
}

/// Engine-braking torque per axle [Nm], signed to oppose `speed`.
///
/// Zero when the throttle is open, the driveline is not engaged or the car
/// is slower than `engine_brake_min_speed`.
pub fn engine_braking(c: &EngineBrakeConditions, engine: &EngineConfig, cfg: &AssistConfig) -> f64 {
    if !c.engaged || c.throttle >= cfg.engine_brake_throttle || c.speed.abs() <= cfg.engine_brake_min_speed {
        return 0.0;
    }
    let closed = 1.0 - c.throttle / cfg.engine_brake_throttle;
    let rpm_share = (c.rpm / engine.max_rpm).clamp(0.0, 1.5);
    let gear_scale = if c.in_first { cfg.engine_brake_first_gear_scale } else { 1.0 };
    // No braking while hanging at idle; full braking `fade_rpm` above it.
    let idle_fade = ramp(c.rpm, engine.idle_rpm, engine.idle_rpm + cfg.engine_brake_fade_rpm);
    let engine_side = cfg.engine_brake_torque * rpm_share * closed.clamp(0.0, 1.0) * gear_scale * idle_fade;
    let axle = (engine_side * c.overall_ratio.abs()).min(cfg.engine_brake_axle_cap);
    -c.speed.signum() * axle
}

// ─── Tests ──────────────────────────────────────────────────────────
