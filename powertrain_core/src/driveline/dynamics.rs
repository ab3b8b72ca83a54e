//! Engine/driveline dynamics owner.
//!
//! Holds engine angular velocity (the single source of truth for RPM), the
//! lifecycle, the rev limiter, creep state and the two-mass coupling. Each
//! tick reads the gearbox output written just before it and produces the
//! wheel torque commands.

use powertrain_common::consts::{FIRST_FORWARD_GEAR, RAD_S_TO_RPM, RPM_TO_RAD_S};
use powertrain_common::powertrain::config::{
    AssistConfig, DrivelineConfig, EngineConfig, LaunchConfig, LimiterConfig,
};
use powertrain_common::powertrain::events::EventSink;
use powertrain_common::powertrain::flags::TorqueCut;
use powertrain_common::powertrain::io::{DriveOutput, WheelCommand};
use powertrain_common::powertrain::state::{DriveMode, EngineRunState};

use super::coupled::{CouplingInputs, TwoMassCoupling};
use super::free_rev::{self, FreeRevInputs};
use super::mode::{ModeInputs, select_mode};
use crate::control::filters::{approach, lerp};
use crate::engine::assist::{CreepAssist, CreepConditions, EngineBrakeConditions, engine_braking};
use crate::engine::{EngineLifecycle, LimiterShaping, RevLimiter, TorqueCurve};
use crate::gearbox::{GearTable, GearboxOutput};

/// Clutch below which the engine counts as unloaded on the free-rev path.
const UNLOADED_CLUTCH: f64 = 0.1;

/// Per-tick inputs besides the gearbox output.
#[derive(Debug, Clone, Copy, Default)]
pub struct DynamicsInput {
    /// Drive pedal after any reverse pedal swap [0, 1].
    pub throttle: f64,
    /// Engine start/stop edge pulse.
    pub engine_toggle: bool,
    /// Signed longitudinal speed [m/s].
    pub speed: f64,
    /// Signed mean driven-wheel RPM.
    pub wheel_rpm: f64,
    pub burnout: bool,
}

/// Internal quantities of the last tick, for telemetry.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DynamicsSnapshot {
    /// Engine-side torque request after shaping [Nm].
    pub torque_request: f64,
    /// Clutch torque on the coupled path [Nm].
    pub clutch_torque: f64,
    /// Creep torque at the engine [Nm].
    pub creep_torque: f64,
    /// Filtered gearbox-side speed [RPM].
    pub gearbox_rpm: f64,
    pub limiter: LimiterShaping,
    /// Torque ramp-in progress [0, 1].
    pub torque_ramp: f64,
}

#[derive(Debug, Clone)]
pub struct DrivelineDynamics {
    engine_cfg: EngineConfig,
    limiter_cfg: LimiterConfig,
    assist_cfg: AssistConfig,
    driveline_cfg: DrivelineConfig,
    launch_rpm: f64,
    curve: TorqueCurve,

    /// Engine angular velocity [rad/s].
    omega: f64,
    lifecycle: EngineLifecycle,
    limiter: RevLimiter,
    creep: CreepAssist,
    coupling: TwoMassCoupling,
    torque_ramp: f64,
    /// Simulation clock [s].
    now: f64,
    mode: DriveMode,
    snapshot: DynamicsSnapshot,
}

impl DrivelineDynamics {
    /// Build from repaired tunables. A running engine spawns at idle, a
    /// stopped one at rest.
    pub fn new(
        engine_cfg: EngineConfig,
        limiter_cfg: LimiterConfig,
        assist_cfg: AssistConfig,
        driveline_cfg: DrivelineConfig,
        launch_cfg: &LaunchConfig,
    ) -> Self {
        let lifecycle = EngineLifecycle::new(engine_cfg.start_running);
        let (omega, mode) = if engine_cfg.start_running {
            (engine_cfg.idle_rpm * RPM_TO_RAD_S, DriveMode::FreeRev)
        } else {
            (0.0, DriveMode::EngineOff)
        };
        Self {
            curve: TorqueCurve::from_points(&engine_cfg.torque_curve),
            launch_rpm: launch_cfg.launch_rpm,
            engine_cfg,
            limiter_cfg,
            assist_cfg,
            driveline_cfg,
            omega,
            lifecycle,
            limiter: RevLimiter::default(),
            creep: CreepAssist::default(),
            coupling: TwoMassCoupling::default(),
            torque_ramp: 0.0,
            now: 0.0,
            mode,
            snapshot: DynamicsSnapshot::default(),
        }
    }

    // ─── Accessors ──────────────────────────────────────────────────

    #[inline]
    pub fn rpm(&self) -> f64 {
        self.omega * RAD_S_TO_RPM
    }

    #[inline]
    pub const fn run_state(&self) -> EngineRunState {
        self.lifecycle.state()
    }

    #[inline]
    pub const fn mode(&self) -> DriveMode {
        self.mode
    }

    #[inline]
    pub const fn snapshot(&self) -> &DynamicsSnapshot {
        &self.snapshot
    }

    pub fn starter_progress(&self) -> f64 {
        self.lifecycle.starter_progress(&self.engine_cfg)
    }

    // ─── Tick ───────────────────────────────────────────────────────

    /// Advance one step. `dt <= 0` returns a zero-torque command.
    pub fn tick(
        &mut self,
        gb: &GearboxOutput,
        table: &GearTable,
        inp: &DynamicsInput,
        dt: f64,
        sink: &mut impl EventSink,
    ) -> DriveOutput {
        if dt.is_nan() || dt <= 0.0 {
            return DriveOutput {
                mode: self.mode,
                ..DriveOutput::default()
            };
        }
        self.now += dt;

        if let Some(forced) = self.lifecycle.tick(inp.engine_toggle, self.rpm(), dt, &self.engine_cfg, sink) {
            self.omega = forced * RPM_TO_RAD_S;
        }
        let running = self.lifecycle.state().is_running();
        let rpm = self.rpm();
        let throttle = inp.throttle;
        let pedal_up = throttle < self.assist_cfg.engine_brake_throttle;
        let overall = table.overall_ratio(gb.gear);
        let omega_g = self.coupling.track_gearbox_speed(
            inp.wheel_rpm,
            overall,
            self.driveline_cfg.wheel_filter_tau,
            dt,
        );

        let mode = select_mode(
            &ModeInputs {
                run_state: self.lifecycle.state(),
                shifting: gb.shifting,
                burnout: inp.burnout,
                clutch: gb.clutch,
                ratio: gb.ratio,
                post_shift_blend: gb.since_shift_end < self.driveline_cfg.post_shift_blend,
                wheel_rpm: inp.wheel_rpm,
                speed: inp.speed,
                pedal_up,
            },
            &self.driveline_cfg,
        );
        if mode != self.mode {
            tracing::trace!(from = ?self.mode, to = ?mode, rpm, "drive mode");
        }
        self.mode = mode;

        let shaping = if running {
            self.limiter.update(rpm, dt, &self.engine_cfg, &self.limiter_cfg)
        } else {
            LimiterShaping::default()
        };

        let mut cuts = gb.cuts;
        cuts.set(TorqueCut::PEDAL_UP, pedal_up);
        cuts.set(TorqueCut::ENGINE_OFF, !running);
        cuts.set(TorqueCut::HARD_CUT, shaping.hard_cut);
        cuts.set(TorqueCut::REV_LIMIT, shaping.blend > 0.0);
        // Creep is the one drive source allowed with the pedal up.
        let creep_blocked = (cuts - TorqueCut::PEDAL_UP).zeroes_drive();

        self.torque_ramp = if pedal_up {
            0.0
        } else if self.driveline_cfg.torque_ramp_time > 0.0 {
            (self.torque_ramp + dt / self.driveline_cfg.torque_ramp_time).min(1.0)
        } else {
            1.0
        };
        let ramp_factor = if gb.launch_active { 1.0 } else { self.torque_ramp };

        let in_first = gb.gear == FIRST_FORWARD_GEAR;
        let creep_torque = self.creep.update(
            &CreepConditions {
                running,
                in_first,
                throttle,
                speed: inp.speed.abs(),
            },
            self.curve.torque_at(self.engine_cfg.idle_rpm),
            dt,
            &self.assist_cfg,
        );
        let creep_torque = if creep_blocked { 0.0 } else { creep_torque };
        let drive_blocked = creep_blocked || (pedal_up && creep_torque <= 0.0);

        let torque_request = if cuts.zeroes_drive() {
            0.0
        } else {
            self.curve.torque_at(rpm)
                * throttle
                * self.engine_cfg.torque_multiplier
                * shaping.torque_scale
                * table.torque_multiplier(gb.gear)
                * self.post_shift_fade(gb)
                * ramp_factor
        };
        let drag = self.engine_cfg.idle_drag
            + self.engine_cfg.drag_per_rad_s * self.omega.max(0.0)
            + shaping.band_drag;
        let launch_rpm = gb.launch_active.then_some(self.launch_rpm);
        let efficiency = table.efficiency();

        let mut out = DriveOutput {
            mode,
            cuts,
            ..DriveOutput::default()
        };
        let mut axle = 0.0;

        match mode {
            DriveMode::EngineOff | DriveMode::StarterSpin => {
                self.coupling.release();
            }
            DriveMode::ActiveShift => {
                self.coupling.release();
                let sync = if gb.ratio == 0.0 {
                    free_rev::target_rpm(throttle, None, self.now, &self.engine_cfg)
                } else {
                    table.mechanical_rpm(gb.gear, inp.wheel_rpm).abs()
                };
                let sync = sync.max(self.engine_cfg.idle_rpm);
                let rate = lerp(
                    self.driveline_cfg.shift_snap_rate_start,
                    self.driveline_cfg.shift_snap_rate_end,
                    gb.shift_fraction,
                );
                let next = approach(rpm, sync, 1.0 / rate.max(f64::EPSILON), dt);
                self.omega = next * RPM_TO_RAD_S;
            }
            DriveMode::Burnout => {
                self.coupling.release();
                let target = free_rev::target_rpm(throttle, None, self.now, &self.engine_cfg);
                let next = free_rev::step(
                    &FreeRevInputs {
                        rpm,
                        target,
                        pedal_up,
                        unloaded: false,
                        hard_cut: shaping.hard_cut,
                        cut_torque: shaping.cut_torque,
                        band_lock_rpm: None,
                    },
                    dt,
                    &self.engine_cfg,
                    &self.driveline_cfg,
                );
                self.omega = next * RPM_TO_RAD_S;
                axle = torque_request * table.overall_ratio(FIRST_FORWARD_GEAR) * efficiency;
                out.front_hold_brake = self.driveline_cfg.burnout_front_brake;
            }
            DriveMode::Coupled => {
                let post_shift = gb.since_shift_end < self.driveline_cfg.post_shift_blend;
                let rigid = gb.clutch >= self.driveline_cfg.lock_clutch && !post_shift;
                let clutch_capacity = if rigid {
                    self.driveline_cfg.rigid_capacity
                } else if post_shift {
                    gb.clutch * self.driveline_cfg.clutch_capacity * self.driveline_cfg.post_shift_capacity_scale
                } else {
                    gb.clutch * self.driveline_cfg.clutch_capacity
                };
                let capacity = clutch_capacity + self.creep.capacity(&self.assist_cfg);
                let step = self.coupling.step(
                    &CouplingInputs {
                        omega_e: self.omega,
                        omega_g,
                        t_request: torque_request + creep_torque,
                        t_drag: drag + shaping.cut_torque,
                        capacity,
                        hold_omega: launch_rpm.unwrap_or(self.engine_cfg.idle_rpm) * RPM_TO_RAD_S,
                        inertia: self.engine_cfg.inertia,
                        torque_slew: self.driveline_cfg.clutch_torque_slew,
                    },
                    dt,
                );
                self.omega = step.omega_e;
                axle = step.clutch_torque * overall * efficiency;
            }
            DriveMode::FreeRev => {
                self.coupling.release();
                let target = free_rev::target_rpm(throttle, launch_rpm, self.now, &self.engine_cfg);
                let mech = table.mechanical_rpm(gb.gear, inp.wheel_rpm).abs();
                let band_lock = (gb.clutch >= self.driveline_cfg.band_lock_clutch
                    && gb.ratio != 0.0
                    && mech >= self.engine_cfg.idle_rpm)
                    .then_some(mech);
                let next = free_rev::step(
                    &FreeRevInputs {
                        rpm,
                        target,
                        pedal_up,
                        unloaded: gb.ratio == 0.0 || gb.clutch < UNLOADED_CLUTCH,
                        hard_cut: shaping.hard_cut,
                        cut_torque: shaping.cut_torque,
                        band_lock_rpm: band_lock,
                    },
                    dt,
                    &self.engine_cfg,
                    &self.driveline_cfg,
                );
                self.omega = next * RPM_TO_RAD_S;
                axle = (torque_request * gb.clutch + creep_torque) * overall * efficiency;
            }
        }

        // Nothing may drive the wheels against the gear at a standstill.
        if inp.speed.abs() < self.driveline_cfg.stop_speed && axle * table.direction(gb.gear) < 0.0 {
            axle = 0.0;
        }
        if drive_blocked || gb.shifting || !axle.is_finite() {
            axle = 0.0;
        }
        let per_wheel = axle * 0.5;
        out.driven = [WheelCommand {
            motor_torque: per_wheel,
            brake_torque: 0.0,
        }; 2];

        if matches!(mode, DriveMode::Coupled | DriveMode::FreeRev) {
            let eb_axle = engine_braking(
                &EngineBrakeConditions {
                    rpm: self.rpm(),
                    throttle,
                    speed: inp.speed,
                    in_first,
                    overall_ratio: overall,
                    engaged: running && !gb.shifting && gb.ratio != 0.0 && gb.clutch >= self.driveline_cfg.lock_clutch,
                },
                &self.engine_cfg,
                &self.assist_cfg,
            );
            let eb_wheel = eb_axle * 0.5;
            out.engine_braking = eb_wheel;
            for wheel in &mut out.driven {
                wheel.brake_torque = eb_wheel.abs();
            }
        }

        self.clamp_speed(running);

        self.snapshot = DynamicsSnapshot {
            torque_request,
            clutch_torque: self.coupling.clutch_torque(),
            creep_torque,
            gearbox_rpm: omega_g * RAD_S_TO_RPM,
            limiter: shaping,
            torque_ramp: self.torque_ramp,
        };
        out
    }

    /// Soften the first moments after a 1→2 upshift.
    fn post_shift_fade(&self, gb: &GearboxOutput) -> f64 {
        let cfg = &self.driveline_cfg;
        let one_to_two = gb.previous_gear == FIRST_FORWARD_GEAR && gb.gear == FIRST_FORWARD_GEAR + 1;
        if !one_to_two || gb.shifting || gb.since_shift_end >= cfg.post_shift_fade_time {
            return 1.0;
        }
        lerp(cfg.post_shift_fade_floor, 1.0, gb.since_shift_end / cfg.post_shift_fade_time.max(f64::EPSILON))
    }

    /// Keep RPM in [idle, limiter + margin] while running, ≥ 0 otherwise.
    fn clamp_speed(&mut self, running: bool) {
        let rpm = self.rpm();
        let clamped = if !rpm.is_finite() {
            if running { self.engine_cfg.idle_rpm } else { 0.0 }
        } else if running {
            rpm.clamp(
                self.engine_cfg.idle_rpm,
                self.engine_cfg.rev_limiter_rpm + self.engine_cfg.rpm_margin,
            )
        } else {
            rpm.max(0.0)
        };
        self.omega = clamped * RPM_TO_RAD_S;
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
