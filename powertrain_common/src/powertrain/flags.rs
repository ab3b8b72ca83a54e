//! Bitflag sets reported by the powertrain core.
//!
//! [`TorqueCut`] explains why drive torque was removed on a given tick.
//! [`ConfigRepair`] records which tunables were replaced with safe defaults
//! during the one-time validation pass.

use bitflags::bitflags;

bitflags! {
    /// Reasons positive drive torque was zeroed or reduced this tick.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TorqueCut: u8 {
        /// Shift torque-cut window open.
        const SHIFT      = 0x01;
        /// Pedal-lift cut window open.
        const LIFT       = 0x02;
        /// Hard-cut pulse at the absolute RPM ceiling.
        const HARD_CUT   = 0x04;
        /// Inside the soft rev-limiter band or above the limiter.
        const REV_LIMIT  = 0x08;
        /// Throttle below the pedal-up threshold.
        const PEDAL_UP   = 0x10;
        /// Engine not running.
        const ENGINE_OFF = 0x20;
        /// Gearbox open for a shift.
        const GEARBOX_OPEN = 0x40;
    }
}

impl TorqueCut {
    /// Flags that force positive drive torque to exactly zero.
    pub const ZEROING_MASK: Self = Self::from_bits_truncate(
        Self::SHIFT.bits()
            | Self::LIFT.bits()
            | Self::HARD_CUT.bits()
            | Self::PEDAL_UP.bits()
            | Self::ENGINE_OFF.bits()
            | Self::GEARBOX_OPEN.bits(),
    );

    /// Returns true if any flag forces drive torque to zero.
    #[inline]
    pub const fn zeroes_drive(&self) -> bool {
        self.intersects(Self::ZEROING_MASK)
    }
}

impl Default for TorqueCut {
    fn default() -> Self {
        Self::empty()
    }
}

bitflags! {
    /// Repairs applied to a malformed configuration at construction.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ConfigRepair: u16 {
        /// Reverse ratio missing or not negative.
        const REVERSE_RATIO        = 0x0001;
        /// Neutral ratio was not exactly zero.
        const NEUTRAL_RATIO        = 0x0002;
        /// Forward ratios missing, non-positive or not strictly descending.
        const FORWARD_RATIOS       = 0x0004;
        /// Reverse-torque multiplier not positive.
        const REVERSE_MULTIPLIER   = 0x0008;
        /// Final drive or drivetrain efficiency out of range.
        const DRIVETRAIN           = 0x0010;
        /// Torque curve empty, unsorted or non-finite.
        const TORQUE_CURVE         = 0x0020;
        /// Engine speed limits inconsistent (idle/max/limiter ordering).
        const RPM_LIMITS           = 0x0040;
        /// Inertia or wheel radius not positive.
        const INERTIA              = 0x0080;
        /// Shift duration not positive.
        const SHIFT_DURATION       = 0x0100;
        /// Clutch slew rate too slow to follow the shift trajectory.
        const CLUTCH_SLEW          = 0x0200;
    }
}

impl Default for ConfigRepair {
    fn default() -> Self {
        Self::empty()
    }
}
