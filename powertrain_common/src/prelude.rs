//! Prelude module for common re-exports.
//!
//! ```rust
//! use powertrain_common::prelude::*;
//! ```

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, LogLevel};
pub use crate::powertrain::config::PowertrainConfig;

// ─── Constants ──────────────────────────────────────────────────────
pub use crate::consts::{FIRST_FORWARD_GEAR, NEUTRAL_GEAR, REVERSE_GEAR};

// ─── Per-Tick I/O ───────────────────────────────────────────────────
pub use crate::powertrain::io::{DriveOutput, DriverInput, WheelCommand, WheelFeedback};

// ─── State & Events ─────────────────────────────────────────────────
pub use crate::powertrain::events::{EventQueue, EventSink, PowertrainEvent};
pub use crate::powertrain::flags::{ConfigRepair, TorqueCut};
pub use crate::powertrain::state::{
    DirectionLatch, DriveMode, EngineRunState, LaunchState, ShiftMode,
};
