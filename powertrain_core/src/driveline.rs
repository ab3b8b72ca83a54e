//! Engine/driveline dynamics.
//!
//! Per-tick mode selection, the two-mass coupled integration, the free-rev
//! path, and the [`DrivelineDynamics`] owner that turns gearbox output into
//! wheel torque commands.

pub mod coupled;
pub mod dynamics;
pub mod free_rev;
pub mod mode;

pub use dynamics::{DrivelineDynamics, DynamicsInput};
