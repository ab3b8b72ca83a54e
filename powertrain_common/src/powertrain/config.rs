//! Tunables for the powertrain core.
//!
//! All config types use `serde::Deserialize` for TOML loading and every
//! field carries a `#[serde(default)]` so partial files load. Validation runs
//! exactly once through [`PowertrainConfig::repaired`]: malformed values are
//! replaced with safe defaults and reported as [`ConfigRepair`] flags, never
//! as errors. Gear-ratio repair lives with the gear table in the core crate.

use serde::{Deserialize, Serialize};

use super::flags::ConfigRepair;
use super::state::ShiftMode;
use crate::consts::{FIRST_FORWARD_GEAR, MAX_GEARS, MAX_TORQUE_POINTS};

/// Current tunables layout version.
pub const CONFIG_VERSION: u32 = 1;

// ─── Top-Level Config ───────────────────────────────────────────────

/// Complete tunables for one vehicle's powertrain.
///
/// Immutable once handed to the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowertrainConfig {
    /// Layout version of this file.
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub gearbox: GearboxConfig,
    #[serde(default)]
    pub shift_policy: ShiftPolicyConfig,
    #[serde(default)]
    pub launch: LaunchConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub limiter: LimiterConfig,
    #[serde(default)]
    pub assist: AssistConfig,
    #[serde(default)]
    pub driveline: DrivelineConfig,
}

fn default_version() -> u32 {
    CONFIG_VERSION
}

impl Default for PowertrainConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            gearbox: GearboxConfig::default(),
            shift_policy: ShiftPolicyConfig::default(),
            launch: LaunchConfig::default(),
            engine: EngineConfig::default(),
            limiter: LimiterConfig::default(),
            assist: AssistConfig::default(),
            driveline: DrivelineConfig::default(),
        }
    }
}

// ─── Gearbox ────────────────────────────────────────────────────────

/// Gear table, final drive and shift execution tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GearboxConfig {
    /// Signed ratios: `[reverse, neutral, first, second, ...]`.
    #[serde(default = "default_ratios")]
    pub ratios: heapless::Vec<f64, MAX_GEARS>,
    #[serde(default = "default_final_drive")]
    pub final_drive: f64,
    /// Drivetrain efficiency (0, 1].
    #[serde(default = "default_efficiency")]
    pub efficiency: f64,
    /// Torque multiplier applied in Reverse.
    #[serde(default = "default_reverse_multiplier")]
    pub reverse_torque_multiplier: f64,
    /// Gear index at spawn.
    #[serde(default = "default_initial_gear")]
    pub initial_gear: u8,
    #[serde(default)]
    pub mode: ShiftMode,
    /// Duration of a timed shift [s].
    #[serde(default = "default_shift_duration")]
    pub shift_duration: f64,
    /// Maximum clutch change rate [1/s].
    #[serde(default = "default_clutch_slew")]
    pub clutch_slew_rate: f64,
    /// Rate at which the clutch relaxes toward 1 outside shifts [1/s].
    #[serde(default = "default_clutch_relax")]
    pub clutch_relax_rate: f64,
    /// Torque-cut tail after an upshift [s].
    #[serde(default = "default_upshift_tail")]
    pub upshift_cut_tail: f64,
    /// Torque-cut tail after a downshift [s].
    #[serde(default = "default_downshift_tail")]
    pub downshift_cut_tail: f64,
    /// Below this |speed| [m/s] a manual downshift from first engages Reverse.
    #[serde(default = "default_reverse_engage_speed")]
    pub reverse_engage_speed: f64,
    /// Lift-cut window length [s].
    #[serde(default = "default_lift_cut")]
    pub lift_cut_duration: f64,
    /// Throttle above which a later lift counts as a pedal lift.
    #[serde(default = "default_lift_high")]
    pub lift_high: f64,
    /// Throttle below which the pedal is considered lifted.
    #[serde(default = "default_lift_low")]
    pub lift_low: f64,
}

fn default_ratios() -> heapless::Vec<f64, MAX_GEARS> {
    let mut v = heapless::Vec::new();
    for r in DEFAULT_RATIOS {
        // DEFAULT_RATIOS.len() <= MAX_GEARS
        let _ = v.push(r);
    }
    v
}

/// Stock ratio table used when none is configured or repair is needed.
pub const DEFAULT_RATIOS: [f64; 8] = [-3.2, 0.0, 3.6, 2.2, 1.5, 1.15, 0.92, 0.75];

fn default_final_drive() -> f64 {
    3.9
}
fn default_efficiency() -> f64 {
    0.9
}
fn default_reverse_multiplier() -> f64 {
    0.75
}
fn default_initial_gear() -> u8 {
    FIRST_FORWARD_GEAR
}
fn default_shift_duration() -> f64 {
    0.3
}
fn default_clutch_slew() -> f64 {
    8.0
}
fn default_clutch_relax() -> f64 {
    4.0
}
fn default_upshift_tail() -> f64 {
    0.12
}
fn default_downshift_tail() -> f64 {
    0.05
}
fn default_reverse_engage_speed() -> f64 {
    0.5
}
fn default_lift_cut() -> f64 {
    0.15
}
fn default_lift_high() -> f64 {
    0.2
}
fn default_lift_low() -> f64 {
    0.05
}

impl Default for GearboxConfig {
    fn default() -> Self {
        Self {
            ratios: default_ratios(),
            final_drive: default_final_drive(),
            efficiency: default_efficiency(),
            reverse_torque_multiplier: default_reverse_multiplier(),
            initial_gear: default_initial_gear(),
            mode: ShiftMode::Automatic,
            shift_duration: default_shift_duration(),
            clutch_slew_rate: default_clutch_slew(),
            clutch_relax_rate: default_clutch_relax(),
            upshift_cut_tail: default_upshift_tail(),
            downshift_cut_tail: default_downshift_tail(),
            reverse_engage_speed: default_reverse_engage_speed(),
            lift_cut_duration: default_lift_cut(),
            lift_high: default_lift_high(),
            lift_low: default_lift_low(),
        }
    }
}

// ─── Auto-Shift Policy ──────────────────────────────────────────────

/// Automatic shift thresholds, hysteresis and direction-latch tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShiftPolicyConfig {
    /// Mechanical RPM at which an upshift is considered.
    pub upshift_rpm: f64,
    /// Mechanical RPM below which a downshift is considered.
    pub downshift_rpm: f64,
    /// Next gear's predicted RPM must stay above `downshift_rpm × margin`.
    pub next_gear_margin: f64,
    /// Minimum throttle for an auto upshift.
    pub upshift_min_throttle: f64,
    /// Throttle above which a downshift counts as kickdown.
    pub kickdown_throttle: f64,
    /// RPM below `downshift_rpm × lug_factor` forces a downshift.
    pub lug_factor: f64,
    /// Time a shift condition must hold continuously [s].
    pub hold_time: f64,
    /// No auto decision within this time after a shift ends [s].
    pub dwell_time: f64,
    /// Minimum time between two shift starts [s].
    pub min_shift_interval: f64,
    /// Engine RPM forcing an immediate upshift.
    pub emergency_rpm: f64,
    /// |speed| below which the vehicle counts as stationary [m/s].
    pub stop_speed: f64,
    /// Pedal value that latches a direction intent.
    pub press_intent: f64,
    /// Pedal value below which a pedal re-arms for latching.
    pub release_intent: f64,
    /// Throttle that pulls the gearbox out of Neutral.
    pub neutral_launch_throttle: f64,
}

impl Default for ShiftPolicyConfig {
    fn default() -> Self {
        Self {
            upshift_rpm: 6300.0,
            downshift_rpm: 2200.0,
            next_gear_margin: 1.15,
            upshift_min_throttle: 0.5,
            kickdown_throttle: 0.85,
            lug_factor: 0.6,
            hold_time: 0.25,
            dwell_time: 0.6,
            min_shift_interval: 0.9,
            emergency_rpm: 7100.0,
            stop_speed: 0.5,
            press_intent: 0.5,
            release_intent: 0.1,
            neutral_launch_throttle: 0.05,
        }
    }
}

// ─── Launch Control ─────────────────────────────────────────────────

/// Launch-control arm/exit thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaunchConfig {
    pub enabled: bool,
    /// Throttle required to arm.
    pub arm_throttle: f64,
    /// |speed| below which launch may arm [m/s].
    pub arm_speed: f64,
    /// |speed| above which an active launch ends [m/s].
    pub exit_speed: f64,
    /// Throttle below which an active launch ends.
    pub exit_throttle: f64,
    /// Maximum time in Active [s].
    pub max_active: f64,
    /// Time spent in Cooldown before returning to Idle [s].
    pub cooldown: f64,
    /// Minimum engine RPM held while Active.
    pub launch_rpm: f64,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            arm_throttle: 0.85,
            arm_speed: 0.5,
            exit_speed: 12.0,
            exit_throttle: 0.3,
            max_active: 2.0,
            cooldown: 1.5,
            launch_rpm: 3800.0,
        }
    }
}

// ─── Engine ─────────────────────────────────────────────────────────

/// One (RPM, Nm) control point of the torque curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TorquePoint {
    pub rpm: f64,
    pub nm: f64,
}

/// Stock torque curve used when none is configured or repair is needed.
pub const DEFAULT_TORQUE_CURVE: [TorquePoint; 7] = [
    TorquePoint { rpm: 0.0, nm: 120.0 },
    TorquePoint { rpm: 1000.0, nm: 180.0 },
    TorquePoint { rpm: 2500.0, nm: 240.0 },
    TorquePoint { rpm: 4000.0, nm: 280.0 },
    TorquePoint { rpm: 5500.0, nm: 270.0 },
    TorquePoint { rpm: 7000.0, nm: 220.0 },
    TorquePoint { rpm: 7600.0, nm: 150.0 },
];

/// Engine speed limits, inertia, torque and free-rev shaping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub idle_rpm: f64,
    /// Redline; top of the throttle map.
    pub max_rpm: f64,
    pub rev_limiter_rpm: f64,
    /// Allowed overshoot above the limiter before the RPM clamp.
    pub rpm_margin: f64,
    /// Engine-side rotating inertia [kg·m²].
    pub inertia: f64,
    pub torque_curve: heapless::Vec<TorquePoint, MAX_TORQUE_POINTS>,
    /// Global torque multiplier.
    pub torque_multiplier: f64,
    /// Constant friction drag [Nm].
    pub idle_drag: f64,
    /// Drag per unit engine speed [Nm/(rad/s)].
    pub drag_per_rad_s: f64,
    /// Spawn with the engine Running.
    pub start_running: bool,
    /// Starter sequence length [s].
    pub starter_duration: f64,
    /// RPM reached at the end of the starter sequence.
    pub starter_rpm: f64,
    /// Debounce between two start/stop toggles [s].
    pub toggle_cooldown: f64,
    /// Exponential RPM decay with the engine off [1/s].
    pub off_decay_rate: f64,
    /// Minimum RPM decay with the engine off [RPM/s].
    pub off_decay_floor: f64,
    /// Free-rev time constant for rising RPM [s].
    pub tau_rise: f64,
    /// Free-rev time constant for falling RPM [s].
    pub tau_fall: f64,
    /// RPM above target (pedal lifted) that triggers anti-hang decay.
    pub anti_hang_margin: f64,
    /// Extra anti-hang decay [RPM/s].
    pub anti_hang_rate: f64,
    /// RPM where high-RPM torque falloff begins.
    pub falloff_start_rpm: f64,
    /// Torque scale reached at the limiter.
    pub falloff_floor: f64,
    /// Idle roughness amplitude on the free-rev target [RPM].
    pub roughness_rpm: f64,
    /// Roughness ripple frequency [Hz].
    pub roughness_hz: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let mut torque_curve = heapless::Vec::new();
        for p in DEFAULT_TORQUE_CURVE {
            let _ = torque_curve.push(p);
        }
        Self {
            idle_rpm: 900.0,
            max_rpm: 6800.0,
            rev_limiter_rpm: 7200.0,
            rpm_margin: 250.0,
            inertia: 0.18,
            torque_curve,
            torque_multiplier: 1.0,
            idle_drag: 12.0,
            drag_per_rad_s: 0.03,
            start_running: true,
            starter_duration: 0.8,
            starter_rpm: 900.0,
            toggle_cooldown: 0.5,
            off_decay_rate: 2.5,
            off_decay_floor: 600.0,
            tau_rise: 0.25,
            tau_fall: 0.18,
            anti_hang_margin: 1500.0,
            anti_hang_rate: 2500.0,
            falloff_start_rpm: 6300.0,
            falloff_floor: 0.7,
            roughness_rpm: 12.0,
            roughness_hz: 7.0,
        }
    }
}

// ─── Rev Limiter ────────────────────────────────────────────────────

/// Soft-band and hard-cut rev limiter shaping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimiterConfig {
    /// Width of the soft band below the limiter [RPM].
    pub soft_band_rpm: f64,
    /// Extra drag at the top of the soft band [Nm].
    pub band_drag: f64,
    /// Hard-cut ceiling above the limiter [RPM].
    pub hard_cut_offset_rpm: f64,
    /// Hard-cut pulse length [s].
    pub hard_cut_pulse: f64,
    /// Negative torque injected during a hard-cut pulse [Nm].
    pub hard_cut_torque: f64,
    /// RPM below the ceiling required before the hard cut re-arms.
    pub rearm_hysteresis_rpm: f64,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            soft_band_rpm: 350.0,
            band_drag: 60.0,
            hard_cut_offset_rpm: 100.0,
            hard_cut_pulse: 0.1,
            hard_cut_torque: 180.0,
            rearm_hysteresis_rpm: 150.0,
        }
    }
}

// ─── Assists ────────────────────────────────────────────────────────

/// Idle creep and engine-braking tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistConfig {
    pub creep_enabled: bool,
    /// Throttle below which creep assist may act.
    pub creep_throttle: f64,
    /// Creep torque as a fraction of the curve at idle.
    pub creep_idle_fraction: f64,
    /// Engine-side creep cap [Nm].
    pub creep_max_torque: f64,
    /// Time for creep torque to ramp in [s].
    pub creep_ramp_time: f64,
    /// |speed| where creep starts fading [m/s].
    pub creep_fade_start: f64,
    /// |speed| where creep is gone [m/s].
    pub creep_fade_end: f64,
    /// Extra clutch capacity allowed for creep near standstill [Nm].
    pub creep_capacity: f64,
    /// Engine-side braking torque at max RPM [Nm].
    pub engine_brake_torque: f64,
    /// Throttle below which the pedal counts as lifted; engine braking applies.
    pub engine_brake_throttle: f64,
    /// Engine braking scale in first gear.
    pub engine_brake_first_gear_scale: f64,
    /// Band above idle over which engine braking fades in [RPM].
    pub engine_brake_fade_rpm: f64,
    /// Per-axle cap on engine braking [Nm].
    pub engine_brake_axle_cap: f64,
    /// |speed| below which no engine braking is applied [m/s].
    pub engine_brake_min_speed: f64,
}

impl Default for AssistConfig {
    fn default() -> Self {
        Self {
            creep_enabled: true,
            creep_throttle: 0.05,
            creep_idle_fraction: 0.35,
            creep_max_torque: 60.0,
            creep_ramp_time: 0.8,
            creep_fade_start: 1.0,
            creep_fade_end: 2.5,
            creep_capacity: 80.0,
            engine_brake_torque: 55.0,
            engine_brake_throttle: 0.05,
            engine_brake_first_gear_scale: 0.4,
            engine_brake_fade_rpm: 400.0,
            engine_brake_axle_cap: 900.0,
            engine_brake_min_speed: 0.5,
        }
    }
}

// ─── Driveline ──────────────────────────────────────────────────────

/// Coupling, clutch capacity and mode-selection tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrivelineConfig {
    /// Low-pass time constant on the gearbox-side speed [s].
    pub wheel_filter_tau: f64,
    /// Clutch value treated as locked.
    pub lock_clutch: f64,
    /// |wheel RPM| below which the wheels count as stopped.
    pub near_zero_wheel_rpm: f64,
    /// Below this |speed| with the pedal up the driveline freewheels [m/s].
    pub freewheel_speed: f64,
    /// Rolling against the gear direction faster than this decouples [m/s].
    pub opposite_roll_guard: f64,
    /// Clutch torque cap when rigidly coupled [Nm].
    pub rigid_capacity: f64,
    /// Clutch torque cap at clutch = 1 when slipping [Nm].
    pub clutch_capacity: f64,
    /// Post-shift blend window [s].
    pub post_shift_blend: f64,
    /// Capacity scale inside the post-shift blend window.
    pub post_shift_capacity_scale: f64,
    /// Clutch torque slew limit [Nm/s].
    pub clutch_torque_slew: f64,
    /// Torque fade-in after a 1→2 upshift [s].
    pub post_shift_fade_time: f64,
    /// Torque scale at the start of the 1→2 fade.
    pub post_shift_fade_floor: f64,
    /// Normal torque ramp-in time after the pedal is pressed [s].
    pub torque_ramp_time: f64,
    /// |speed| below which the vehicle counts as essentially stopped [m/s].
    pub stop_speed: f64,
    /// Rev-match snap rate at the start of a shift [1/s].
    pub shift_snap_rate_start: f64,
    /// Rev-match snap rate at the end of a shift [1/s].
    pub shift_snap_rate_end: f64,
    /// Clutch value enabling the band-lock nudge in the free-rev path.
    pub band_lock_clutch: f64,
    /// Band-lock nudge time constant [s].
    pub band_lock_tau: f64,
    /// Pedal level (both pedals) that requests a burnout.
    pub burnout_pedal: f64,
    /// |speed| below which a burnout may run [m/s].
    pub burnout_speed: f64,
    /// Holding brake on each front wheel during a burnout [Nm].
    pub burnout_front_brake: f64,
}

impl Default for DrivelineConfig {
    fn default() -> Self {
        Self {
            wheel_filter_tau: 0.15,
            lock_clutch: 0.95,
            near_zero_wheel_rpm: 2.0,
            freewheel_speed: 2.5,
            opposite_roll_guard: 0.5,
            rigid_capacity: 1500.0,
            clutch_capacity: 650.0,
            post_shift_blend: 0.25,
            post_shift_capacity_scale: 0.6,
            clutch_torque_slew: 6000.0,
            post_shift_fade_time: 0.35,
            post_shift_fade_floor: 0.55,
            torque_ramp_time: 0.3,
            stop_speed: 0.3,
            shift_snap_rate_start: 6.0,
            shift_snap_rate_end: 25.0,
            band_lock_clutch: 0.9,
            band_lock_tau: 0.08,
            burnout_pedal: 0.5,
            burnout_speed: 1.5,
            burnout_front_brake: 2500.0,
        }
    }
}

// ─── Repair Pass ────────────────────────────────────────────────────

impl PowertrainConfig {
    /// Replace malformed scalar tunables with safe defaults.
    ///
    /// Returns the repaired config and the set of repairs applied. Each
    /// repair is logged once as a warning. Gear ratios are repaired when the
    /// gear table is built.
    pub fn repaired(mut self) -> (Self, ConfigRepair) {
        let mut repairs = ConfigRepair::empty();

        {
            let gb = &mut self.gearbox;
            let defaults = GearboxConfig::default();
            if !positive(gb.final_drive) {
                tracing::warn!(final_drive = gb.final_drive, "final drive not positive, using default");
                gb.final_drive = defaults.final_drive;
                repairs |= ConfigRepair::DRIVETRAIN;
            }
            if !(positive(gb.efficiency) && gb.efficiency <= 1.0) {
                tracing::warn!(efficiency = gb.efficiency, "efficiency outside (0, 1], using default");
                gb.efficiency = defaults.efficiency;
                repairs |= ConfigRepair::DRIVETRAIN;
            }
            if !positive(gb.shift_duration) {
                tracing::warn!(shift_duration = gb.shift_duration, "shift duration not positive, using default");
                gb.shift_duration = defaults.shift_duration;
                repairs |= ConfigRepair::SHIFT_DURATION;
            }
            // Each half of the shift trajectory swings the clutch by 1.0.
            let required = 2.0 / gb.shift_duration * 1.05;
            if !gb.clutch_slew_rate.is_finite() || gb.clutch_slew_rate < required {
                tracing::warn!(
                    clutch_slew_rate = gb.clutch_slew_rate,
                    required,
                    "clutch slew rate cannot follow the shift trajectory, raising it"
                );
                gb.clutch_slew_rate = required.max(defaults.clutch_slew_rate);
                repairs |= ConfigRepair::CLUTCH_SLEW;
            }
            if !positive(gb.clutch_relax_rate) || gb.clutch_relax_rate > gb.clutch_slew_rate {
                gb.clutch_relax_rate = gb.clutch_slew_rate.min(defaults.clutch_relax_rate);
                repairs |= ConfigRepair::CLUTCH_SLEW;
            }
        }

        {
            let e = &mut self.engine;
            let defaults = EngineConfig::default();
            let ordered = positive(e.idle_rpm)
                && e.idle_rpm < e.max_rpm
                && e.max_rpm < e.rev_limiter_rpm
                && positive(e.rpm_margin);
            if !ordered {
                tracing::warn!(
                    idle = e.idle_rpm,
                    max = e.max_rpm,
                    limiter = e.rev_limiter_rpm,
                    "engine RPM limits inconsistent, using defaults"
                );
                e.idle_rpm = defaults.idle_rpm;
                e.max_rpm = defaults.max_rpm;
                e.rev_limiter_rpm = defaults.rev_limiter_rpm;
                e.rpm_margin = defaults.rpm_margin;
                repairs |= ConfigRepair::RPM_LIMITS;
            }
            if !(positive(e.starter_rpm) && e.starter_rpm <= e.idle_rpm) {
                e.starter_rpm = e.idle_rpm;
                repairs |= ConfigRepair::RPM_LIMITS;
            }
            if !positive(e.inertia) {
                tracing::warn!(inertia = e.inertia, "engine inertia not positive, using default");
                e.inertia = defaults.inertia;
                repairs |= ConfigRepair::INERTIA;
            }
            if !curve_is_valid(&e.torque_curve) {
                tracing::warn!(points = e.torque_curve.len(), "torque curve malformed, using default");
                e.torque_curve = defaults.torque_curve;
                repairs |= ConfigRepair::TORQUE_CURVE;
            }
        }

        {
            let l = &mut self.limiter;
            let margin = self.engine.rpm_margin;
            if !(positive(l.hard_cut_offset_rpm) && l.hard_cut_offset_rpm < margin) {
                tracing::warn!(
                    offset = l.hard_cut_offset_rpm,
                    margin,
                    "hard-cut ceiling outside the RPM margin, placing it mid-margin"
                );
                l.hard_cut_offset_rpm = margin * 0.5;
                repairs |= ConfigRepair::RPM_LIMITS;
            }
        }

        (self, repairs)
    }
}

/// Sorted by strictly increasing RPM, finite, non-negative torque, ≥ 1 point.
fn curve_is_valid(points: &[TorquePoint]) -> bool {
    !points.is_empty()
        && points
            .iter()
            .all(|p| p.rpm.is_finite() && p.nm.is_finite() && p.nm >= 0.0)
        && points.windows(2).all(|w| w[0].rpm < w[1].rpm)
}

#[inline]
fn positive(v: f64) -> bool {
    v.is_finite() && v > 0.0
}

// ─── Tests ──────────────────────────────────────────────────────────
