//! Outward notifications emitted by the powertrain core.
//!
//! Events are plain `Copy` messages pushed into an [`EventSink`]; the
//! default sink is the fixed-capacity [`EventQueue`] drained by the owning
//! vehicle after each tick.

use serde::{Deserialize, Serialize};
use static_assertions::assert_impl_all;

use super::state::LaunchState;
use crate::consts::MAX_PENDING_EVENTS;

/// Notification for audio/VFX and HUD collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PowertrainEvent {
    /// Selected gear changed (gear table indices).
    GearChanged { from: u8, to: u8 },
    /// Starter sequence completed; engine is Running.
    EngineStarted,
    /// Engine switched off.
    EngineStopped,
    /// Launch-control state machine moved.
    LaunchStateChanged { from: LaunchState, to: LaunchState },
}

assert_impl_all!(PowertrainEvent: Copy, Send, Sync);

/// Receiver of outward notifications.
pub trait EventSink {
    /// Deliver one event. Must not block.
    fn emit(&mut self, event: PowertrainEvent);
}

/// Fixed-capacity FIFO of pending events.
///
/// When full, further events are dropped and counted in [`EventQueue::dropped`].
#[derive(Debug, Clone, Default)]
pub struct EventQueue {
    pending: heapless::Vec<PowertrainEvent, MAX_PENDING_EVENTS>,
    dropped: u32,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events pushed since the last drain, oldest first.
    #[inline]
    pub fn pending(&self) -> &[PowertrainEvent] {
        &self.pending
    }

    /// Number of events lost to overflow since creation.
    #[inline]
    pub const fn dropped(&self) -> u32 {
        self.dropped
    }

    /// Take all pending events, leaving the queue empty.
    pub fn drain(&mut self) -> heapless::Vec<PowertrainEvent, MAX_PENDING_EVENTS> {
        core::mem::take(&mut self.pending)
    }
}

impl EventSink for EventQueue {
    fn emit(&mut self, event: PowertrainEvent) {
        if self.pending.push(event).is_err() {
            self.dropped = self.dropped.saturating_add(1);
            tracing::warn!(?event, "event queue full, dropping event");
        }
    }
}
