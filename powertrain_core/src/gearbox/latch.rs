//! Direction intent latch (automatic mode).
//!
//! While the vehicle is below the stop speed, a pedal press past
//! `press_intent` latches that pedal's direction. A pedal only re-arms after
//! dropping below `release_intent`, so a pedal resting between the two
//! thresholds (spawn noise, a foot hovering) never flips direction.

use powertrain_common::powertrain::config::ShiftPolicyConfig;
use powertrain_common::powertrain::state::DirectionLatch;

/// Latched direction plus per-pedal re-arm flags.
#[derive(Debug, Clone, Copy)]
pub struct DirectionLatchState {
    latch: DirectionLatch,
    throttle_armed: bool,
    brake_armed: bool,
}

impl Default for DirectionLatchState {
    fn default() -> Self {
        Self {
            latch: DirectionLatch::Forward,
            throttle_armed: true,
            brake_armed: true,
        }
    }
}

impl DirectionLatchState {
    #[inline]
    pub const fn latch(&self) -> DirectionLatch {
        self.latch
    }

    /// Force the latch, e.g. when a gear is placed directly.
    #[inline]
    pub fn set(&mut self, latch: DirectionLatch) {
        self.latch = latch;
    }

    /// Update from raw pedals. Returns the new latch if it changed.
    ///
    /// Latching only happens when `stationary`; re-arming happens always.
    /// With both pedals pressed on the same tick the throttle wins.
    pub fn update(
        &mut self,
        throttle: f64,
        brake: f64,
        stationary: bool,
        suppress: bool,
        cfg: &ShiftPolicyConfig,
    ) -> Option<DirectionLatch> {
        if throttle < cfg.release_intent {
            self.throttle_armed = true;
        }
        if brake < cfg.release_intent {
            self.brake_armed = true;
        }
        if !stationary || suppress {
            return None;
        }

        let before = self.latch;
        if self.brake_armed && brake >= cfg.press_intent {
            self.brake_armed = false;
            self.latch = DirectionLatch::Reverse;
        }
        if self.throttle_armed && throttle >= cfg.press_intent {
            self.throttle_armed = false;
            self.latch = DirectionLatch::Forward;
        }
        (self.latch != before).then_some(self.latch)
    }
}
