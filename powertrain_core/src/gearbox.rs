//! Gear/clutch side of the powertrain.
//!
//! - `table`: validated gear ratios
//! - `latch`: direction intent at standstill
//! - `policy`: automatic up/downshift decisions
//! - `shift`: clutch trajectory and torque-cut windows
//! - `launch`: launch-control state machine
//! - `machine`: the per-tick gearbox state machine tying them together

pub mod latch;
pub mod launch;
pub mod machine;
pub mod policy;
pub mod shift;
pub mod table;

pub use machine::{GearboxInput, GearboxOutput, GearboxStateMachine, ShiftTransition};
pub use table::{GearLabel, GearTable};
