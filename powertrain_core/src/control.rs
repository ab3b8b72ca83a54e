//! Signal conditioning root.
//!
//! Filters, slew limiting and interpolation shared by the gear/clutch state
//! machine and the driveline dynamics.

pub mod filters;
