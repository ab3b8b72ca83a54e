//! # Powertrain Core Library
//!
//! Fixed-step powertrain simulation for one arcade vehicle: the gear and
//! clutch state machine plus the engine and driveline dynamics that turn
//! driver input and wheel feedback into per-wheel torque commands.
//!
//! ## Per-Tick Order
//!
//! 1. **Gearbox**: cut windows, shift progress, manual pulses, direction
//!    latch, auto-shift policy, launch control, clutch slew
//! 2. **Dynamics**: engine lifecycle, mode selection, limiter, torque
//!    request, mode integration, engine braking, RPM clamp
//!
//! [`cycle::Powertrain`] runs both halves in that order and is the only
//! owner of their state.
//!
//! ## Allocation-Free Tick
//!
//! Gear tables, torque curves and the event queue are fixed-capacity
//! `heapless` containers. A tick performs no heap allocation.

#![deny(clippy::disallowed_types)]

pub mod config;
pub mod control;
pub mod cycle;
pub mod driveline;
pub mod engine;
pub mod gearbox;
pub mod sim;

pub use cycle::{Powertrain, Telemetry, TickStats};
