//! Gear/clutch state machine.
//!
//! Owns gear selection, the shift process and clutch trajectory, torque-cut
//! windows, the direction latch, the automatic shift policy and launch
//! control. Ticked once per step before the driveline dynamics.
//!
//! ```text
//! tick:
//!   advance shift timer ─► manual pulses ─► (auto) latch + intent + policy
//!   ─► launch control ─► clutch slew ─► GearboxOutput
//! ```

use powertrain_common::consts::{FIRST_FORWARD_GEAR, NEUTRAL_GEAR, REVERSE_GEAR};
use powertrain_common::powertrain::config::{GearboxConfig, LaunchConfig, ShiftPolicyConfig};
use powertrain_common::powertrain::events::{EventSink, PowertrainEvent};
use powertrain_common::powertrain::flags::TorqueCut;
use powertrain_common::powertrain::state::{DirectionLatch, LaunchState, ShiftMode};

use super::latch::DirectionLatchState;
use super::launch::{LaunchControl, LaunchInputs};
use super::policy::{AutoShiftPolicy, PolicyInputs, ShiftDecision};
use super::shift::{CutWindows, ShiftProcess};
use super::table::GearTable;
use crate::control::filters::slew;

/// Result of a gear request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShiftTransition {
    /// Timed shift into the gear began.
    Started(u8),
    /// Gear engaged instantly, no clutch blend.
    Engaged(u8),
    /// Request ignored; state unchanged.
    Rejected(&'static str),
}

impl ShiftTransition {
    #[inline]
    pub const fn is_accepted(self) -> bool {
        !matches!(self, Self::Rejected(_))
    }
}

/// Per-tick inputs to the gearbox.
#[derive(Debug, Clone, Copy, Default)]
pub struct GearboxInput {
    /// Drive pedal after any reverse pedal swap [0, 1].
    pub throttle: f64,
    /// Raw throttle pedal, read by the direction latch.
    pub raw_throttle: f64,
    /// Raw brake pedal, read by the direction latch.
    pub raw_brake: f64,
    pub shift_up: bool,
    pub shift_down: bool,
    /// Signed longitudinal speed [m/s].
    pub speed: f64,
    /// Signed mean driven-wheel RPM.
    pub wheel_rpm: f64,
    pub engine_rpm: f64,
    /// Gas and brake held near standstill.
    pub burnout: bool,
}

/// Gearbox values read by the driveline dynamics this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GearboxOutput {
    /// Selected gear; the target gear while shifting.
    pub gear: u8,
    /// Gear before the most recent change.
    pub previous_gear: u8,
    /// Signed gearbox ratio of `gear`.
    pub ratio: f64,
    /// Clutch engagement [0, 1].
    pub clutch: f64,
    pub shifting: bool,
    /// Fraction of the current shift elapsed, 0 when idle.
    pub shift_fraction: f64,
    pub last_shift_was_upshift: bool,
    /// Time since the last shift completed [s].
    pub since_shift_end: f64,
    pub launch_active: bool,
    /// Gearbox-side cuts (SHIFT, LIFT, GEARBOX_OPEN).
    pub cuts: TorqueCut,
}

#[derive(Debug, Clone)]
pub struct GearboxStateMachine {
    table: GearTable,
    gearbox_cfg: GearboxConfig,
    policy_cfg: ShiftPolicyConfig,
    launch_cfg: LaunchConfig,
    mode: ShiftMode,

    gear: u8,
    previous_gear: u8,
    shift: ShiftProcess,
    clutch: f64,
    /// Simulation clock [s].
    now: f64,
    last_shift_timestamp: f64,
    last_shift_end: f64,
    last_shift_was_upshift: bool,

    cuts: CutWindows,
    latch: DirectionLatchState,
    policy: AutoShiftPolicy,
    launch: LaunchControl,
}

impl GearboxStateMachine {
    /// Create the machine with the configured initial gear engaged.
    ///
    /// An initial gear outside the table falls back to first forward.
    pub fn new(
        table: GearTable,
        gearbox_cfg: GearboxConfig,
        policy_cfg: ShiftPolicyConfig,
        launch_cfg: LaunchConfig,
    ) -> Self {
        let gear = if table.contains(gearbox_cfg.initial_gear) {
            gearbox_cfg.initial_gear
        } else {
            FIRST_FORWARD_GEAR
        };
        let mut latch = DirectionLatchState::default();
        if gear == REVERSE_GEAR {
            latch.set(DirectionLatch::Reverse);
        }
        Self {
            mode: gearbox_cfg.mode,
            table,
            gearbox_cfg,
            policy_cfg,
            launch_cfg,
            gear,
            previous_gear: gear,
            shift: ShiftProcess::default(),
            clutch: 1.0,
            now: 0.0,
            last_shift_timestamp: f64::NEG_INFINITY,
            last_shift_end: f64::NEG_INFINITY,
            last_shift_was_upshift: false,
            cuts: CutWindows::default(),
            latch,
            policy: AutoShiftPolicy::default(),
            launch: LaunchControl::default(),
        }
    }

    // ─── Accessors ──────────────────────────────────────────────────

    #[inline]
    pub fn table(&self) -> &GearTable {
        &self.table
    }

    #[inline]
    pub const fn gear(&self) -> u8 {
        self.gear
    }

    #[inline]
    pub const fn clutch(&self) -> f64 {
        self.clutch
    }

    #[inline]
    pub const fn is_shifting(&self) -> bool {
        self.shift.is_active()
    }

    #[inline]
    pub const fn mode(&self) -> ShiftMode {
        self.mode
    }

    #[inline]
    pub fn set_mode(&mut self, mode: ShiftMode) {
        self.mode = mode;
    }

    #[inline]
    pub const fn direction_latch(&self) -> DirectionLatch {
        self.latch.latch()
    }

    #[inline]
    pub const fn launch_state(&self) -> LaunchState {
        self.launch.state()
    }

    /// Simulation time of the most recent shift start [s].
    #[inline]
    pub const fn last_shift_timestamp(&self) -> f64 {
        self.last_shift_timestamp
    }

    // ─── Tick ───────────────────────────────────────────────────────

    /// Advance one step. `dt <= 0` leaves state untouched.
    pub fn tick(&mut self, inp: &GearboxInput, dt: f64, sink: &mut impl EventSink) -> GearboxOutput {
        if dt.is_nan() || dt <= 0.0 {
            return self.output();
        }
        self.now += dt;
        let now = self.now;
        self.cuts.clear_expired(now);
        if self.cuts.observe_pedal(inp.throttle, now, &self.gearbox_cfg) {
            tracing::trace!(now, "pedal lift, lift cut opened");
        }

        let completed = self.shift.advance(dt);
        if completed {
            self.last_shift_end = now;
            tracing::debug!(
                from = %self.table.label(self.shift.from()),
                to = %self.table.label(self.shift.to()),
                "shift complete"
            );
        }

        if inp.shift_up {
            self.request_shift_up(sink);
        }
        if inp.shift_down {
            self.request_shift_down(inp.speed, sink);
        }

        if self.mode == ShiftMode::Automatic {
            let stationary = inp.speed.abs() < self.policy_cfg.stop_speed;
            if let Some(latch) = self.latch.update(
                inp.raw_throttle,
                inp.raw_brake,
                stationary,
                inp.burnout,
                &self.policy_cfg,
            ) {
                tracing::debug!(?latch, "direction intent latched");
            }
            self.apply_direction_intent(inp.throttle, stationary, sink);
            self.run_policy(inp, dt, sink);
        }

        let launch_inputs = LaunchInputs {
            in_first: self.gear == FIRST_FORWARD_GEAR,
            shifting: self.shift.is_active(),
            speed: inp.speed.abs(),
            throttle: inp.throttle,
        };
        if let Some((from, to)) = self.launch.tick(&launch_inputs, dt, &self.launch_cfg) {
            sink.emit(PowertrainEvent::LaunchStateChanged { from, to });
        }

        let rate = if self.shift.is_active() {
            self.gearbox_cfg.clutch_slew_rate
        } else {
            self.gearbox_cfg.clutch_relax_rate
        };
        self.clutch = slew(self.clutch, self.shift.clutch_target(), rate, dt).clamp(0.0, 1.0);
        // A finished shift leaves the clutch locked, unless a new one just began.
        if completed && !self.shift.is_active() {
            self.clutch = 1.0;
        }

        self.output()
    }

    fn apply_direction_intent(&mut self, throttle: f64, stationary: bool, sink: &mut impl EventSink) {
        if self.shift.is_active() {
            return;
        }
        match self.latch.latch() {
            DirectionLatch::Reverse if stationary && self.gear != REVERSE_GEAR => {
                self.engage_immediate(REVERSE_GEAR, sink);
            }
            DirectionLatch::Forward if self.gear == REVERSE_GEAR && stationary => {
                self.request_gear(FIRST_FORWARD_GEAR, sink);
            }
            DirectionLatch::Forward
                if self.gear == NEUTRAL_GEAR && throttle > self.policy_cfg.neutral_launch_throttle =>
            {
                self.request_gear(FIRST_FORWARD_GEAR, sink);
            }
            _ => {}
        }
    }

    fn run_policy(&mut self, inp: &GearboxInput, dt: f64, sink: &mut impl EventSink) {
        let policy_inputs = PolicyInputs {
            gear: self.gear,
            throttle: inp.throttle,
            wheel_rpm: inp.wheel_rpm,
            engine_rpm: inp.engine_rpm,
            since_shift_end: self.now - self.last_shift_end,
            since_shift_start: self.now - self.last_shift_timestamp,
            shifting: self.shift.is_active(),
        };
        let Some(decision) = self.policy.evaluate(&policy_inputs, &self.table, &self.policy_cfg, dt) else {
            return;
        };
        if let ShiftDecision::EmergencyUpshift(_) = decision {
            tracing::debug!(rpm = inp.engine_rpm, "emergency upshift");
        }
        self.request_gear(decision.target(), sink);
    }

    // ─── Requests ───────────────────────────────────────────────────

    /// Start a timed shift into `target`.
    ///
    /// Requesting the current gear, or any gear while a shift is running,
    /// is a no-op.
    pub fn request_gear(&mut self, target: u8, sink: &mut impl EventSink) -> ShiftTransition {
        if let Some(reason) = self.reject_reason(target) {
            return ShiftTransition::Rejected(reason);
        }
        let from = self.gear;
        let upshift = target > from;
        let duration = self.gearbox_cfg.shift_duration;
        let tail = if upshift {
            self.gearbox_cfg.upshift_cut_tail
        } else {
            self.gearbox_cfg.downshift_cut_tail
        };

        self.shift.start(from, target, duration);
        self.cuts.open_shift(self.now, duration + tail);
        self.last_shift_timestamp = self.now;
        self.last_shift_was_upshift = upshift;
        self.policy.reset();
        self.change_gear(target, sink);
        ShiftTransition::Started(target)
    }

    /// Engage `target` instantly with no clutch blend or cut window.
    pub fn engage_immediate(&mut self, target: u8, sink: &mut impl EventSink) -> ShiftTransition {
        if target == self.gear && !self.shift.is_active() {
            return ShiftTransition::Rejected("already in requested gear");
        }
        if !self.table.contains(target) {
            return ShiftTransition::Rejected("no such gear");
        }
        self.shift.cancel();
        self.last_shift_end = self.now;
        self.policy.reset();
        if target != self.gear {
            self.change_gear(target, sink);
        }
        ShiftTransition::Engaged(target)
    }

    /// Sequential shift up: R → N → 1 → 2 …
    pub fn request_shift_up(&mut self, sink: &mut impl EventSink) -> ShiftTransition {
        if self.shift.is_active() {
            return ShiftTransition::Rejected("shift already in progress");
        }
        if self.gear >= self.table.top_gear() {
            return ShiftTransition::Rejected("already in top gear");
        }
        self.request_gear(self.gear + 1, sink)
    }

    /// Sequential shift down.
    ///
    /// From first gear this goes to Neutral when moving faster than
    /// `reverse_engage_speed`, otherwise straight into Reverse. From Neutral,
    /// Reverse is only engaged when slow enough.
    pub fn request_shift_down(&mut self, speed: f64, sink: &mut impl EventSink) -> ShiftTransition {
        if self.shift.is_active() {
            return ShiftTransition::Rejected("shift already in progress");
        }
        let slow = speed.abs() <= self.gearbox_cfg.reverse_engage_speed;
        match self.gear {
            REVERSE_GEAR => ShiftTransition::Rejected("already in reverse"),
            NEUTRAL_GEAR if slow => self.engage_immediate(REVERSE_GEAR, sink),
            NEUTRAL_GEAR => ShiftTransition::Rejected("too fast to engage reverse"),
            FIRST_FORWARD_GEAR if slow => self.engage_immediate(REVERSE_GEAR, sink),
            FIRST_FORWARD_GEAR => self.request_gear(NEUTRAL_GEAR, sink),
            g => self.request_gear(g - 1, sink),
        }
    }

    fn reject_reason(&self, target: u8) -> Option<&'static str> {
        if self.shift.is_active() {
            Some("shift already in progress")
        } else if target == self.gear {
            Some("already in requested gear")
        } else if !self.table.contains(target) {
            Some("no such gear")
        } else {
            None
        }
    }

    fn change_gear(&mut self, target: u8, sink: &mut impl EventSink) {
        let from = self.gear;
        self.previous_gear = from;
        self.gear = target;
        self.latch.set(if target == REVERSE_GEAR {
            DirectionLatch::Reverse
        } else {
            DirectionLatch::Forward
        });
        if let Some((lfrom, lto)) = self.launch.force_cooldown() {
            sink.emit(PowertrainEvent::LaunchStateChanged { from: lfrom, to: lto });
        }
        tracing::debug!(
            from = %self.table.label(from),
            to = %self.table.label(target),
            shifting = self.shift.is_active(),
            "gear changed"
        );
        sink.emit(PowertrainEvent::GearChanged { from, to: target });
    }

    fn output(&self) -> GearboxOutput {
        let shifting = self.shift.is_active();
        let mut cuts = TorqueCut::empty();
        cuts.set(TorqueCut::SHIFT, self.cuts.shift_cut_active(self.now));
        cuts.set(TorqueCut::LIFT, self.cuts.lift_cut_active(self.now));
        cuts.set(TorqueCut::GEARBOX_OPEN, shifting);
        GearboxOutput {
            gear: self.gear,
            previous_gear: self.previous_gear,
            ratio: self.table.ratio(self.gear),
            clutch: self.clutch,
            shifting,
            shift_fraction: self.shift.fraction(),
            last_shift_was_upshift: self.last_shift_was_upshift,
            since_shift_end: self.now - self.last_shift_end,
            launch_active: self.launch.is_active(),
            cuts,
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use powertrain_common::powertrain::events::EventQueue;

    use super::*;

    const DT: f64 = 1.0 / 250.0;

    fn machine(mode: ShiftMode) -> GearboxStateMachine {
        let gearbox_cfg = GearboxConfig {
            mode,
            ..GearboxConfig::default()
        };
        let (table, _) = GearTable::from_config(&gearbox_cfg);
        GearboxStateMachine::new(
            table,
            gearbox_cfg,
            ShiftPolicyConfig::default(),
            LaunchConfig::default(),
        )
    }

    fn gear_changes(q: &mut EventQueue) -> usize {
        q.drain()
            .iter()
            .filter(|e| matches!(e, PowertrainEvent::GearChanged { .. }))
            .count()
    }

    #[test]
    fn starts_in_first_with_locked_clutch() {
        let m = machine(ShiftMode::Automatic);
        assert_eq!(m.gear(), FIRST_FORWARD_GEAR);
        assert_eq!(m.clutch(), 1.0);
        assert!(!m.is_shifting());
    }

    #[test]
    fn same_gear_request_is_noop() {
        let mut m = machine(ShiftMode::Manual);
        let mut q = EventQueue::new();
        let ts = m.last_shift_timestamp();
        assert!(matches!(
            m.request_gear(FIRST_FORWARD_GEAR, &mut q),
            ShiftTransition::Rejected(_)
        ));
        assert!(!m.is_shifting());
        assert_eq!(m.last_shift_timestamp(), ts);
        assert!(q.pending().is_empty());
    }

    #[test]
    fn request_while_shifting_is_rejected() {
        let mut m = machine(ShiftMode::Manual);
        let mut q = EventQueue::new();
        assert_eq!(m.request_shift_up(&mut q), ShiftTransition::Started(FIRST_FORWARD_GEAR + 1));
        assert!(matches!(m.request_shift_up(&mut q), ShiftTransition::Rejected(_)));
        assert_eq!(gear_changes(&mut q), 1);
    }

    #[test]
    fn shift_opens_and_closes_clutch_within_slew() {
        let mut m = machine(ShiftMode::Manual);
        let mut q = EventQueue::new();
        let cfg = GearboxConfig::default();
        m.request_shift_up(&mut q);
        let input = GearboxInput::default();
        let mut prev = m.clutch();
        let mut min_clutch: f64 = 1.0;
        let mut out = m.tick(&input, DT, &mut q);
        let mut ticks = 0;
        while out.shifting {
            assert!((0.0..=1.0).contains(&out.clutch));
            assert!((out.clutch - prev).abs() <= cfg.clutch_slew_rate * DT + 1e-9);
            assert!(out.cuts.contains(TorqueCut::GEARBOX_OPEN));
            min_clutch = min_clutch.min(out.clutch);
            prev = out.clutch;
            out = m.tick(&input, DT, &mut q);
            ticks += 1;
            assert!(ticks < 1000);
        }
        assert!(min_clutch < 0.05);
        // The cut tail outlives the shift itself.
        assert!(out.cuts.contains(TorqueCut::SHIFT));
    }

    #[test]
    fn clutch_locks_on_the_tick_the_shift_ends() {
        let mut m = machine(ShiftMode::Manual);
        let mut q = EventQueue::new();
        let input = GearboxInput {
            speed: 8.0,
            ..GearboxInput::default()
        };
        m.request_shift_up(&mut q);
        let mut ticks = 0;
        loop {
            let out = m.tick(&input, DT, &mut q);
            if !out.shifting {
                assert_eq!(out.clutch, 1.0);
                assert_eq!(m.clutch(), 1.0);
                break;
            }
            ticks += 1;
            assert!(ticks < 1000);
        }
        assert_eq!(m.gear(), FIRST_FORWARD_GEAR + 1);
    }

    #[test]
    fn manual_downshift_from_first_depends_on_speed() {
        let mut m = machine(ShiftMode::Manual);
        let mut q = EventQueue::new();
        assert_eq!(m.request_shift_down(0.0, &mut q), ShiftTransition::Engaged(REVERSE_GEAR));
        assert!(!m.is_shifting());

        let mut m = machine(ShiftMode::Manual);
        assert_eq!(m.request_shift_down(3.0, &mut q), ShiftTransition::Started(NEUTRAL_GEAR));
        assert!(m.is_shifting());
    }

    #[test]
    fn manual_down_from_neutral_rejected_when_fast() {
        let mut m = machine(ShiftMode::Manual);
        let mut q = EventQueue::new();
        m.engage_immediate(NEUTRAL_GEAR, &mut q);
        assert!(matches!(m.request_shift_down(5.0, &mut q), ShiftTransition::Rejected(_)));
        assert_eq!(m.gear(), NEUTRAL_GEAR);
    }

    #[test]
    fn neutral_throttle_starts_single_shift_to_first() {
        let mut m = machine(ShiftMode::Automatic);
        let mut q = EventQueue::new();
        m.engage_immediate(NEUTRAL_GEAR, &mut q);
        q.drain();
        let input = GearboxInput {
            throttle: 0.8,
            raw_throttle: 0.8,
            ..GearboxInput::default()
        };
        for _ in 0..250 {
            m.tick(&input, DT, &mut q);
        }
        assert_eq!(m.gear(), FIRST_FORWARD_GEAR);
        assert_eq!(gear_changes(&mut q), 1);
    }

    #[test]
    fn neutral_without_throttle_stays() {
        let mut m = machine(ShiftMode::Automatic);
        let mut q = EventQueue::new();
        m.engage_immediate(NEUTRAL_GEAR, &mut q);
        for _ in 0..100 {
            m.tick(&GearboxInput::default(), DT, &mut q);
        }
        assert_eq!(m.gear(), NEUTRAL_GEAR);
    }

    #[test]
    fn brake_at_standstill_snaps_to_reverse() {
        let mut m = machine(ShiftMode::Automatic);
        let mut q = EventQueue::new();
        let input = GearboxInput {
            raw_brake: 0.8,
            ..GearboxInput::default()
        };
        m.tick(&input, DT, &mut q);
        assert_eq!(m.gear(), REVERSE_GEAR);
        assert!(!m.is_shifting());
        assert_eq!(m.clutch(), 1.0);
    }

    #[test]
    fn throttle_in_reverse_returns_to_first() {
        let mut m = machine(ShiftMode::Automatic);
        let mut q = EventQueue::new();
        m.tick(
            &GearboxInput {
                raw_brake: 0.8,
                ..GearboxInput::default()
            },
            DT,
            &mut q,
        );
        assert_eq!(m.gear(), REVERSE_GEAR);
        m.tick(&GearboxInput::default(), DT, &mut q);
        let forward = GearboxInput {
            raw_throttle: 0.8,
            ..GearboxInput::default()
        };
        m.tick(&forward, DT, &mut q);
        assert_eq!(m.gear(), FIRST_FORWARD_GEAR);
        assert!(m.is_shifting());
    }

    #[test]
    fn burnout_suppresses_latch() {
        let mut m = machine(ShiftMode::Automatic);
        let mut q = EventQueue::new();
        let input = GearboxInput {
            throttle: 0.9,
            raw_throttle: 0.9,
            raw_brake: 0.9,
            burnout: true,
            ..GearboxInput::default()
        };
        for _ in 0..50 {
            m.tick(&input, DT, &mut q);
        }
        assert_eq!(m.gear(), FIRST_FORWARD_GEAR);
    }

    #[test]
    fn shift_forces_launch_cooldown() {
        let mut m = machine(ShiftMode::Manual);
        let mut q = EventQueue::new();
        let input = GearboxInput {
            throttle: 1.0,
            raw_throttle: 1.0,
            ..GearboxInput::default()
        };
        m.tick(&input, DT, &mut q);
        m.tick(&input, DT, &mut q);
        assert_eq!(m.launch_state(), LaunchState::Active);
        m.request_shift_up(&mut q);
        assert_eq!(m.launch_state(), LaunchState::Cooldown);
    }

    #[test]
    fn zero_dt_is_noop() {
        let mut m = machine(ShiftMode::Manual);
        let mut q = EventQueue::new();
        m.request_shift_up(&mut q);
        let before = m.tick(&GearboxInput::default(), DT, &mut q).shift_fraction;
        let after = m.tick(&GearboxInput::default(), 0.0, &mut q);
        assert_eq!(after.shift_fraction, before);
        assert!(after.shifting);
    }
}
