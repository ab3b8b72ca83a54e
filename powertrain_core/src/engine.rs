//! Engine model: torque curve, start/stop lifecycle, rev limiter shaping and
//! the low-speed assists (idle creep, engine braking).

pub mod assist;
pub mod curve;
pub mod lifecycle;
pub mod limiter;

pub use curve::TorqueCurve;
pub use lifecycle::EngineLifecycle;
pub use limiter::{LimiterShaping, RevLimiter};
