//! Powertrain Common Library
//!
//! Shared constants, configuration loading and the data types exchanged
//! between the powertrain simulation core and the vehicle that owns it.
//!
//! # Module Structure
//!
//! - [`consts`] - Gear indices, capacities and unit conversions
//! - [`config`] - TOML loading trait, log level and loader errors
//! - [`powertrain`] - Tunables, per-tick I/O, state enums, events, flags
//! - [`prelude`] - Common re-exports for convenience

pub mod config;
pub mod consts;
pub mod powertrain;
pub mod prelude;
