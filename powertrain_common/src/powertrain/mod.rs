//! Powertrain shared types.
//!
//! Everything exchanged between the powertrain core and its collaborators
//! lives here: tunables, per-tick I/O, state enums, outward events and
//! bitflag reports.

pub mod config;
pub mod events;
pub mod flags;
pub mod io;
pub mod state;
