//! Launch-control state machine (first gear only).
//!
//! ```text
//! Idle → Armed      stationary-ish, throttle ≥ arm, not in cooldown
//! Armed → Active    arm conditions still hold on the next tick
//! Armed → Idle      arm conditions lost
//! Active → Cooldown exit speed, throttle drop, max duration, gear/shift change
//! Cooldown → Idle   after the cooldown duration
//! ```
//!
//! Any shift while Armed or Active forces Cooldown.

use powertrain_common::powertrain::config::LaunchConfig;
use powertrain_common::powertrain::state::LaunchState;

/// Per-tick conditions consulted by the launch machine.
#[derive(Debug, Clone, Copy)]
pub struct LaunchInputs {
    /// Gearbox is in first forward gear.
    pub in_first: bool,
    pub shifting: bool,
    /// |longitudinal speed| [m/s].
    pub speed: f64,
    pub throttle: f64,
}

/// A state change, reported for the outward event.
pub type LaunchTransition = (LaunchState, LaunchState);

#[derive(Debug, Clone, Copy, Default)]
pub struct LaunchControl {
    state: LaunchState,
    /// Time spent in Active [s].
    active_elapsed: f64,
    /// Time spent in Cooldown [s].
    cooldown_elapsed: f64,
}

impl LaunchControl {
    #[inline]
    pub const fn state(&self) -> LaunchState {
        self.state
    }

    #[inline]
    pub const fn is_active(&self) -> bool {
        matches!(self.state, LaunchState::Active)
    }

    /// Advance one tick.
    pub fn tick(&mut self, inp: &LaunchInputs, dt: f64, cfg: &LaunchConfig) -> Option<LaunchTransition> {
        use LaunchState::*;

        let arm_ok = cfg.enabled
            && inp.in_first
            && !inp.shifting
            && inp.speed < cfg.arm_speed
            && inp.throttle >= cfg.arm_throttle;

        let next = match self.state {
            Idle if arm_ok => Armed,
            Idle => Idle,
            Armed if arm_ok => {
                self.active_elapsed = 0.0;
                Active
            }
            Armed => Idle,
            Active => {
                self.active_elapsed += dt;
                let exit = inp.speed > cfg.exit_speed
                    || inp.throttle < cfg.exit_throttle
                    || self.active_elapsed >= cfg.max_active
                    || !inp.in_first
                    || inp.shifting;
                if exit {
                    self.cooldown_elapsed = 0.0;
                    Cooldown
                } else {
                    Active
                }
            }
            Cooldown => {
                self.cooldown_elapsed += dt;
                if self.cooldown_elapsed >= cfg.cooldown {
                    Idle
                } else {
                    Cooldown
                }
            }
        };

        self.transition_to(next)
    }

    /// Shift requested while Armed/Active: drop straight to Cooldown.
    pub fn force_cooldown(&mut self) -> Option<LaunchTransition> {
        if matches!(self.state, LaunchState::Armed | LaunchState::Active) {
            self.cooldown_elapsed = 0.0;
            self.transition_to(LaunchState::Cooldown)
        } else {
            None
        }
    }

    fn transition_to(&mut self, next: LaunchState) -> Option<LaunchTransition> {
        let prev = self.state;
        if prev == next {
            return None;
        }
        self.state = next;
        tracing::debug!(
            from = ?prev,
            to = ?next,
            active_s = self.active_elapsed,
            "launch control transition"
        );
        Some((prev, next))
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
