//! Drive mode selection.
//!
//! Modes are mutually exclusive and checked in priority order:
//!
//! ```text
//! EngineOff → StarterSpin → ActiveShift → Burnout → Coupled → FreeRev
//! ```

use powertrain_common::powertrain::config::DrivelineConfig;
use powertrain_common::powertrain::state::{DriveMode, EngineRunState};

/// Facts the mode selector looks at.
#[derive(Debug, Clone, Copy)]
pub struct ModeInputs {
    pub run_state: EngineRunState,
    pub shifting: bool,
    pub burnout: bool,
    pub clutch: f64,
    /// Signed gearbox ratio of the engaged gear.
    pub ratio: f64,
    /// Inside the post-shift blend window.
    pub post_shift_blend: bool,
    /// Signed mean driven-wheel RPM.
    pub wheel_rpm: f64,
    /// Signed longitudinal speed [m/s].
    pub speed: f64,
    pub pedal_up: bool,
}

pub fn select_mode(m: &ModeInputs, cfg: &DrivelineConfig) -> DriveMode {
    match m.run_state {
        EngineRunState::Off => DriveMode::EngineOff,
        EngineRunState::Starting => DriveMode::StarterSpin,
        EngineRunState::Running if m.shifting => DriveMode::ActiveShift,
        EngineRunState::Running if m.burnout => DriveMode::Burnout,
        EngineRunState::Running if is_coupled(m, cfg) => DriveMode::Coupled,
        EngineRunState::Running => DriveMode::FreeRev,
    }
}

/// Mechanically coupled: engaged, in gear, wheels turning, not coasting
/// to a stop and not rolling against the gear.
fn is_coupled(m: &ModeInputs, cfg: &DrivelineConfig) -> bool {
    let in_gear = m.ratio != 0.0;
    let engaged = m.clutch >= cfg.lock_clutch || m.post_shift_blend;
    let turning = m.wheel_rpm.abs() > cfg.near_zero_wheel_rpm;
    let coasting_slow = m.pedal_up && m.speed.abs() < cfg.freewheel_speed;
    let against_gear = m.speed * m.ratio.signum() < -cfg.opposite_roll_guard;
    in_gear && engaged && turning && !coasting_slow && !against_gear
}
