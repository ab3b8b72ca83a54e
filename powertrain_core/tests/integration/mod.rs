//! Closed-loop and frozen-feedback scenarios.

mod config_loading;
mod cruise;
mod engine_lifecycle;
mod harness;
mod launch;
mod reverse;
mod shifting;
