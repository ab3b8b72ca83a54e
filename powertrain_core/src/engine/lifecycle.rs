//! Engine start/stop lifecycle.
//!
//! ```text
//! Off ──toggle──► Starting ──starter done──► Running ──toggle──► Off
//!                    └──────────toggle──────────────────────────► Off
//! ```
//!
//! Toggles are edge pulses; a toggle inside `toggle_cooldown` of the previous
//! accepted toggle is ignored. While Off the engine spins down to exactly 0;
//! while Starting RPM ramps to `starter_rpm` with no torque output.

use powertrain_common::powertrain::config::EngineConfig;
use powertrain_common::powertrain::events::{EventSink, PowertrainEvent};
use powertrain_common::powertrain::state::EngineRunState;

use crate::control::filters::lerp;

#[derive(Debug, Clone, Copy)]
pub struct EngineLifecycle {
    state: EngineRunState,
    /// Time since the starter engaged [s].
    starter_elapsed: f64,
    /// RPM when the starter engaged.
    starter_from: f64,
    /// Time since the last accepted toggle [s].
    since_toggle: f64,
}

impl EngineLifecycle {
    pub fn new(start_running: bool) -> Self {
        Self {
            state: if start_running {
                EngineRunState::Running
            } else {
                EngineRunState::Off
            },
            starter_elapsed: 0.0,
            starter_from: 0.0,
            since_toggle: f64::INFINITY,
        }
    }

    #[inline]
    pub const fn state(&self) -> EngineRunState {
        self.state
    }

    /// Starter progress in [0, 1]; 0 outside Starting.
    pub fn starter_progress(&self, cfg: &EngineConfig) -> f64 {
        match self.state {
            EngineRunState::Starting => (self.starter_elapsed / cfg.starter_duration.max(f64::EPSILON)).min(1.0),
            _ => 0.0,
        }
    }

    /// Advance one tick.
    ///
    /// Returns the RPM the lifecycle imposes (Off, Starting), or `None` when
    /// Running and the dynamics own engine speed.
    pub fn tick(
        &mut self,
        toggle: bool,
        rpm: f64,
        dt: f64,
        cfg: &EngineConfig,
        sink: &mut impl EventSink,
    ) -> Option<f64> {
        self.since_toggle += dt;
        if toggle {
            self.handle_toggle(rpm, cfg, sink);
        }

        match self.state {
            EngineRunState::Running => None,
            EngineRunState::Off => {
                let decay = (rpm * cfg.off_decay_rate).max(cfg.off_decay_floor) * dt;
                Some((rpm - decay).max(0.0))
            }
            EngineRunState::Starting => {
                self.starter_elapsed += dt;
                let progress = self.starter_progress(cfg);
                if progress >= 1.0 {
                    self.transition_to(EngineRunState::Running);
                    sink.emit(PowertrainEvent::EngineStarted);
                    return Some(cfg.starter_rpm);
                }
                Some(lerp(self.starter_from, cfg.starter_rpm, progress))
            }
        }
    }

    fn handle_toggle(&mut self, rpm: f64, cfg: &EngineConfig, sink: &mut impl EventSink) {
        if self.since_toggle < cfg.toggle_cooldown {
            tracing::debug!(since = self.since_toggle, "engine toggle debounced");
            return;
        }
        self.since_toggle = 0.0;
        match self.state {
            EngineRunState::Off => {
                self.starter_elapsed = 0.0;
                self.starter_from = rpm.clamp(0.0, cfg.starter_rpm);
                self.transition_to(EngineRunState::Starting);
            }
            EngineRunState::Starting | EngineRunState::Running => {
                self.transition_to(EngineRunState::Off);
                sink.emit(PowertrainEvent::EngineStopped);
            }
        }
    }

    fn transition_to(&mut self, next: EngineRunState) {
        tracing::debug!(from = ?self.state, to = ?next, "engine lifecycle transition");
        self.state = next;
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
