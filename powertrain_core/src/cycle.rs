//! Per-step orchestration: input → gear/clutch machine → driveline dynamics.
//!
//! [`Powertrain`] owns the only reference to gearbox and engine state. One
//! call to [`Powertrain::tick`] runs the gearbox first and the dynamics
//! second, so the dynamics always read the gear and clutch written in the
//! same step. Wheel feedback is whatever the body model reported at the end
//! of the previous step.

use serde::Serialize;
use static_assertions::assert_impl_all;

use powertrain_common::consts::{MAX_PENDING_EVENTS, REVERSE_GEAR};
use powertrain_common::powertrain::config::{DrivelineConfig, PowertrainConfig};
use powertrain_common::powertrain::events::{EventQueue, PowertrainEvent};
use powertrain_common::powertrain::flags::ConfigRepair;
use powertrain_common::powertrain::io::{DriveOutput, DriverInput, WheelFeedback};
use powertrain_common::powertrain::state::{
    DirectionLatch, DriveMode, EngineRunState, LaunchState, ShiftMode,
};

use crate::driveline::{DrivelineDynamics, DynamicsInput};
use crate::gearbox::{GearLabel, GearTable, GearboxInput, GearboxStateMachine, ShiftTransition};

// ─── Tick Statistics ────────────────────────────────────────────────

/// O(1) per-tick counters.
#[derive(Debug, Clone)]
pub struct TickStats {
    /// Ticks executed.
    pub tick_count: u64,
    /// Ticks spent in each [`DriveMode`], indexed by discriminant.
    pub mode_ticks: [u64; DriveMode::COUNT],
    /// Largest |motor torque| commanded on one wheel [Nm].
    pub max_motor_torque: f64,
    /// Ticks skipped because `dt` was not positive.
    pub skipped: u64,
}

impl TickStats {
    pub const fn new() -> Self {
        Self {
            tick_count: 0,
            mode_ticks: [0; DriveMode::COUNT],
            max_motor_torque: 0.0,
            skipped: 0,
        }
    }

    #[inline]
    pub fn record(&mut self, out: &DriveOutput) {
        self.tick_count += 1;
        self.mode_ticks[out.mode as usize] += 1;
        for wheel in &out.driven {
            self.max_motor_torque = self.max_motor_torque.max(wheel.motor_torque.abs());
        }
    }

    /// Fraction of ticks spent in `mode` (0 if no ticks).
    pub fn mode_share(&self, mode: DriveMode) -> f64 {
        if self.tick_count == 0 {
            0.0
        } else {
            self.mode_ticks[mode as usize] as f64 / self.tick_count as f64
        }
    }
}

impl Default for TickStats {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Telemetry ──────────────────────────────────────────────────────

/// Snapshot of the powertrain after a tick, for HUD and logging.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Telemetry {
    /// Simulation time [s].
    pub time: f64,
    pub gear: u8,
    pub gear_label: char,
    pub engine_rpm: f64,
    pub clutch: f64,
    pub shifting: bool,
    pub mode: DriveMode,
    pub run_state: EngineRunState,
    pub launch: LaunchState,
    pub latch: DirectionLatch,
    /// Total motor torque on the driven wheels [Nm].
    pub motor_torque: f64,
    /// Engine braking per driven wheel [Nm], signed.
    pub engine_braking: f64,
    /// Engine-side torque request [Nm].
    pub torque_request: f64,
    /// Clutch torque on the coupled path [Nm].
    pub clutch_torque: f64,
    /// Longitudinal speed fed in this tick [m/s].
    pub speed: f64,
}

// ─── Powertrain ─────────────────────────────────────────────────────

/// The powertrain simulation core for one vehicle.
#[derive(Debug, Clone)]
pub struct Powertrain {
    gearbox: GearboxStateMachine,
    dynamics: DrivelineDynamics,
    driveline_cfg: DrivelineConfig,
    events: EventQueue,
    repairs: ConfigRepair,
    stats: TickStats,
    toggle_requested: bool,
    /// Simulation clock [s].
    time: f64,
    last_output: DriveOutput,
    last_speed: f64,
}

assert_impl_all!(Powertrain: Send, Sync);
assert_impl_all!(Telemetry: Copy, Send);

impl Powertrain {
    /// Build the core from tunables, repairing anything malformed.
    ///
    /// Never fails; the applied repairs are available from
    /// [`Powertrain::config_repairs`].
    pub fn new(config: PowertrainConfig) -> Self {
        let (config, mut repairs) = config.repaired();
        let (table, table_repairs) = GearTable::from_config(&config.gearbox);
        repairs |= table_repairs;
        if !repairs.is_empty() {
            tracing::warn!(?repairs, "powertrain config repaired");
        }

        let dynamics = DrivelineDynamics::new(
            config.engine,
            config.limiter,
            config.assist,
            config.driveline.clone(),
            &config.launch,
        );
        let gearbox = GearboxStateMachine::new(table, config.gearbox, config.shift_policy, config.launch);
        let mode = dynamics.mode();
        tracing::debug!(gear = %gearbox.table().label(gearbox.gear()), ?mode, "powertrain created");

        Self {
            gearbox,
            dynamics,
            driveline_cfg: config.driveline,
            events: EventQueue::new(),
            repairs,
            stats: TickStats::new(),
            toggle_requested: false,
            time: 0.0,
            last_output: DriveOutput {
                mode,
                ..DriveOutput::default()
            },
            last_speed: 0.0,
        }
    }

    /// Advance one fixed step.
    ///
    /// A non-positive or non-finite `dt` changes nothing and returns a
    /// zero-torque command.
    pub fn tick(&mut self, dt: f64, input: &DriverInput, wheels: &WheelFeedback) -> DriveOutput {
        if !(dt.is_finite() && dt > 0.0) {
            self.stats.skipped += 1;
            return DriveOutput {
                mode: self.last_output.mode,
                ..DriveOutput::default()
            };
        }
        let input = input.sanitized();
        let speed = wheels.speed();
        let wheel_rpm = wheels.mean_wheel_rpm();
        let burnout = self.burnout_requested(&input, wheels);

        let (drive_pedal, _) = self.pedals(&input);
        let gb_out = self.gearbox.tick(
            &GearboxInput {
                throttle: drive_pedal,
                raw_throttle: input.throttle,
                raw_brake: input.brake,
                shift_up: input.shift_up,
                shift_down: input.shift_down,
                speed,
                wheel_rpm,
                engine_rpm: self.dynamics.rpm(),
                burnout,
            },
            dt,
            &mut self.events,
        );

        // The gear may have just changed direction.
        let (drive_pedal, service_brake) = self.pedals(&input);
        let engine_toggle = input.engine_toggle || core::mem::take(&mut self.toggle_requested);
        let mut out = self.dynamics.tick(
            &gb_out,
            self.gearbox.table(),
            &DynamicsInput {
                throttle: drive_pedal,
                engine_toggle,
                speed,
                wheel_rpm,
                burnout,
            },
            dt,
            &mut self.events,
        );
        // Burnout holds the front axle through `front_hold_brake`; the driven
        // wheels stay unbraked.
        out.service_brake = if out.mode == DriveMode::Burnout { 0.0 } else { service_brake };

        self.time += dt;
        self.last_speed = speed;
        self.last_output = out;
        self.stats.record(&out);
        out
    }

    /// (drive pedal, service brake). In automatic Reverse the brake pedal
    /// drives and the throttle pedal brakes.
    fn pedals(&self, input: &DriverInput) -> (f64, f64) {
        if self.gearbox.mode() == ShiftMode::Automatic && self.gearbox.gear() == REVERSE_GEAR {
            (input.brake, input.throttle)
        } else {
            (input.throttle, input.brake)
        }
    }

    /// Both pedals held near standstill in a forward gear.
    fn burnout_requested(&self, input: &DriverInput, wheels: &WheelFeedback) -> bool {
        let cfg = &self.driveline_cfg;
        wheels.grounded
            && input.throttle > cfg.burnout_pedal
            && input.brake > cfg.burnout_pedal
            && wheels.speed().abs() < cfg.burnout_speed
            && self.gearbox.table().is_forward(self.gearbox.gear())
            && self.dynamics.run_state().is_running()
    }

    // ─── Requests ───────────────────────────────────────────────────

    /// Queue an engine start/stop toggle for the next tick.
    pub fn request_engine_toggle(&mut self) {
        self.toggle_requested = true;
    }

    /// Place a gear directly (spawn, teleport), with no clutch blend.
    pub fn engage_gear_immediate(&mut self, index: u8) -> ShiftTransition {
        self.gearbox.engage_immediate(index, &mut self.events)
    }

    /// Request a timed shift into `index`.
    pub fn request_gear(&mut self, index: u8) -> ShiftTransition {
        self.gearbox.request_gear(index, &mut self.events)
    }

    pub fn set_shift_mode(&mut self, mode: ShiftMode) {
        self.gearbox.set_mode(mode);
    }

    /// Take all events emitted since the last drain, oldest first.
    pub fn drain_events(&mut self) -> heapless::Vec<PowertrainEvent, MAX_PENDING_EVENTS> {
        self.events.drain()
    }

    // ─── Accessors ──────────────────────────────────────────────────

    #[inline]
    pub const fn gear_index(&self) -> u8 {
        self.gearbox.gear()
    }

    #[inline]
    pub fn gear_label(&self) -> GearLabel {
        self.gearbox.table().label(self.gearbox.gear())
    }

    #[inline]
    pub fn engine_rpm(&self) -> f64 {
        self.dynamics.rpm()
    }

    #[inline]
    pub const fn is_reverse(&self) -> bool {
        self.gearbox.gear() == REVERSE_GEAR
    }

    #[inline]
    pub const fn is_shifting(&self) -> bool {
        self.gearbox.is_shifting()
    }

    #[inline]
    pub fn launch_active(&self) -> bool {
        self.gearbox.launch_state() == LaunchState::Active
    }

    #[inline]
    pub const fn clutch(&self) -> f64 {
        self.gearbox.clutch()
    }

    #[inline]
    pub const fn drive_mode(&self) -> DriveMode {
        self.dynamics.mode()
    }

    #[inline]
    pub const fn run_state(&self) -> EngineRunState {
        self.dynamics.run_state()
    }

    #[inline]
    pub const fn shift_mode(&self) -> ShiftMode {
        self.gearbox.mode()
    }

    #[inline]
    pub const fn config_repairs(&self) -> ConfigRepair {
        self.repairs
    }

    #[inline]
    pub const fn stats(&self) -> &TickStats {
        &self.stats
    }

    #[inline]
    pub const fn time(&self) -> f64 {
        self.time
    }

    #[inline]
    pub fn table(&self) -> &GearTable {
        self.gearbox.table()
    }

    #[inline]
    pub const fn events_dropped(&self) -> u32 {
        self.events.dropped()
    }

    pub fn telemetry(&self) -> Telemetry {
        let snap = self.dynamics.snapshot();
        Telemetry {
            time: self.time,
            gear: self.gear_index(),
            gear_label: self.gear_label().as_char(),
            engine_rpm: self.engine_rpm(),
            clutch: self.clutch(),
            shifting: self.is_shifting(),
            mode: self.drive_mode(),
            run_state: self.run_state(),
            launch: self.gearbox.launch_state(),
            latch: self.gearbox.direction_latch(),
            motor_torque: self.last_output.total_motor_torque(),
            engine_braking: self.last_output.engine_braking,
            torque_request: snap.torque_request,
            clutch_torque: snap.clutch_torque,
            speed: self.last_speed,
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
