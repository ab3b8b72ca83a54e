//! Two-mass engine ↔ gearbox coupling.
//!
//! The engine and the gearbox side are separate rotating bodies joined by
//! the clutch. Each tick the clutch torque that would synchronise them in
//! one step is computed, limited by capacity and slew, and the engine is
//! integrated against it:
//!
//! ```text
//! T_sync = J·(ω_e − ω_target)/dt + (T_req − T_drag)
//! T_c    = slew(clamp(T_sync, ±capacity))
//! ω_e   += (T_req − T_drag − T_c)/J · dt
//! ```
//!
//! `ω_target` is the gearbox-side speed, or the hold speed (idle or launch
//! RPM) when the gearbox side is slower; the clutch then slips forward only.

use powertrain_common::consts::{MIN_DIVISOR, RPM_TO_RAD_S};

use crate::control::filters::{LowPassState, slew};

/// Per-tick inputs to the coupling step.
#[derive(Debug, Clone, Copy)]
pub struct CouplingInputs {
    /// Engine speed [rad/s].
    pub omega_e: f64,
    /// Filtered gearbox-side speed [rad/s].
    pub omega_g: f64,
    /// Engine torque request after shaping [Nm].
    pub t_request: f64,
    /// Friction, band and hard-cut drag [Nm].
    pub t_drag: f64,
    /// Clutch torque capacity [Nm].
    pub capacity: f64,
    /// Engine speed the clutch slips to hold when the gearbox side is
    /// slower: idle, or the launch RPM while launch control is active [rad/s].
    pub hold_omega: f64,
    /// Engine inertia [kg·m²].
    pub inertia: f64,
    /// Clutch torque slew limit [Nm/s].
    pub torque_slew: f64,
}

/// Result of one coupling step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CouplingStep {
    pub omega_e: f64,
    /// Torque transmitted through the clutch [Nm], engine side.
    pub clutch_torque: f64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TwoMassCoupling {
    gearbox_filter: LowPassState,
    clutch_torque: f64,
}

impl TwoMassCoupling {
    /// Filter the gearbox-side speed implied by `wheel_rpm` through
    /// `overall_ratio`. Called every tick so the filter is warm on entry.
    pub fn track_gearbox_speed(&mut self, wheel_rpm: f64, overall_ratio: f64, tau: f64, dt: f64) -> f64 {
        let raw = wheel_rpm * overall_ratio * RPM_TO_RAD_S;
        self.gearbox_filter.apply(raw, tau, dt)
    }

    #[inline]
    pub const fn clutch_torque(&self) -> f64 {
        self.clutch_torque
    }

    /// Drop the transmitted torque; the next coupled tick slews up from 0.
    #[inline]
    pub fn release(&mut self) {
        self.clutch_torque = 0.0;
    }

    pub fn step(&mut self, c: &CouplingInputs, dt: f64) -> CouplingStep {
        let inertia = c.inertia.max(MIN_DIVISOR);
        let dt = dt.max(MIN_DIVISOR);
        let capacity = c.capacity.max(0.0);
        // Below the hold speed the clutch slips and only ever drives the wheels.
        let (target, floor) = if c.hold_omega > c.omega_g {
            (c.hold_omega, 0.0)
        } else {
            (c.omega_g, -capacity)
        };
        let t_net = c.t_request - c.t_drag;
        let t_sync = inertia * (c.omega_e - target) / dt + t_net;
        let limited = t_sync.clamp(floor, capacity);
        self.clutch_torque = slew(self.clutch_torque, limited, c.torque_slew, dt);

        let omega_e = c.omega_e + (t_net - self.clutch_torque) / inertia * dt;
        CouplingStep {
            omega_e,
            clutch_torque: self.clutch_torque,
        }
    }
}
