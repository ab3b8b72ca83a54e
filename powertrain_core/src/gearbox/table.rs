//! Gear ratio table with one-time repair.
//!
//! Index 0 is Reverse (negative ratio), index 1 is Neutral (exactly 0),
//! indices ≥ 2 are forward gears with strictly descending positive ratios.
//! A malformed table is repaired at construction and never fails.

use core::fmt;

use powertrain_common::consts::{FIRST_FORWARD_GEAR, MAX_GEARS, MIN_DIVISOR, NEUTRAL_GEAR, REVERSE_GEAR};
use powertrain_common::powertrain::config::{DEFAULT_RATIOS, GearboxConfig};
use powertrain_common::powertrain::flags::ConfigRepair;

/// Fallback reverse-torque multiplier.
const DEFAULT_REVERSE_MULTIPLIER: f64 = 0.75;

/// Human-readable gear name for HUD collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GearLabel {
    Reverse,
    Neutral,
    /// 1-based forward gear number.
    Forward(u8),
}

impl GearLabel {
    /// Single-character HUD form: 'R', 'N', '1'..'8'.
    pub fn as_char(self) -> char {
        match self {
            Self::Reverse => 'R',
            Self::Neutral => 'N',
            Self::Forward(n) => char::from_digit(u32::from(n), 10).unwrap_or('?'),
        }
    }
}

impl fmt::Display for GearLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reverse => f.write_str("R"),
            Self::Neutral => f.write_str("N"),
            Self::Forward(n) => write!(f, "{n}"),
        }
    }
}

/// Immutable, validated gear table plus final drive.
#[derive(Debug, Clone, PartialEq)]
pub struct GearTable {
    ratios: heapless::Vec<f64, MAX_GEARS>,
    final_drive: f64,
    efficiency: f64,
    reverse_multiplier: f64,
}

impl GearTable {
    /// Build the table from config, repairing anything malformed.
    ///
    /// Returns the table and the repairs applied (each logged as a warning).
    pub fn from_config(cfg: &GearboxConfig) -> (Self, ConfigRepair) {
        let mut repairs = ConfigRepair::empty();
        let src = &cfg.ratios;

        let reverse = match src.first() {
            Some(&r) if r.is_finite() && r < 0.0 => r,
            other => {
                tracing::warn!(reverse = ?other, "reverse ratio missing or not negative, using default");
                repairs |= ConfigRepair::REVERSE_RATIO;
                DEFAULT_RATIOS[REVERSE_GEAR as usize]
            }
        };

        if src.get(NEUTRAL_GEAR as usize).is_some_and(|&n| n != 0.0) {
            tracing::warn!("neutral ratio not zero, forcing 0");
            repairs |= ConfigRepair::NEUTRAL_RATIO;
        } else if src.len() <= NEUTRAL_GEAR as usize {
            repairs |= ConfigRepair::NEUTRAL_RATIO;
        }

        let forward = src.get(FIRST_FORWARD_GEAR as usize..).unwrap_or(&[]);
        let forward_ok = !forward.is_empty()
            && forward.iter().all(|r| r.is_finite() && *r > 0.0)
            && forward.windows(2).all(|w| w[0] > w[1]);
        let forward: &[f64] = if forward_ok {
            forward
        } else {
            tracing::warn!(count = forward.len(), "forward ratios malformed, using default set");
            repairs |= ConfigRepair::FORWARD_RATIOS;
            &DEFAULT_RATIOS[FIRST_FORWARD_GEAR as usize..]
        };

        let mut ratios = heapless::Vec::new();
        // Capacity: 2 + forward.len() <= MAX_GEARS because forward came from
        // a table of at most MAX_GEARS entries.
        let _ = ratios.push(reverse);
        let _ = ratios.push(0.0);
        for &r in forward {
            let _ = ratios.push(r);
        }

        let reverse_multiplier =
            if cfg.reverse_torque_multiplier.is_finite() && cfg.reverse_torque_multiplier > 0.0 {
                cfg.reverse_torque_multiplier
            } else {
                tracing::warn!(
                    multiplier = cfg.reverse_torque_multiplier,
                    "reverse torque multiplier not positive, using default"
                );
                repairs |= ConfigRepair::REVERSE_MULTIPLIER;
                DEFAULT_REVERSE_MULTIPLIER
            };

        let table = Self {
            ratios,
            final_drive: cfg.final_drive.max(MIN_DIVISOR),
            efficiency: cfg.efficiency.clamp(MIN_DIVISOR, 1.0),
            reverse_multiplier,
        };
        (table, repairs)
    }

    /// Number of entries (Reverse + Neutral + forward gears).
    #[inline]
    pub fn len(&self) -> u8 {
        self.ratios.len() as u8
    }

    /// A repaired table is never empty; provided for API symmetry.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ratios.is_empty()
    }

    /// Highest forward gear index.
    #[inline]
    pub fn top_gear(&self) -> u8 {
        self.len() - 1
    }

    /// True if `index` names an entry of this table.
    #[inline]
    pub fn contains(&self, index: u8) -> bool {
        (index as usize) < self.ratios.len()
    }

    /// Signed gearbox ratio; out-of-range indices read as Neutral.
    #[inline]
    pub fn ratio(&self, index: u8) -> f64 {
        self.ratios.get(index as usize).copied().unwrap_or(0.0)
    }

    /// Ratio × final drive.
    #[inline]
    pub fn overall_ratio(&self, index: u8) -> f64 {
        self.ratio(index) * self.final_drive
    }

    #[inline]
    pub const fn final_drive(&self) -> f64 {
        self.final_drive
    }

    #[inline]
    pub const fn efficiency(&self) -> f64 {
        self.efficiency
    }

    /// Engine RPM implied by a wheel speed in gear `index` (signed).
    #[inline]
    pub fn mechanical_rpm(&self, index: u8, wheel_rpm: f64) -> f64 {
        wheel_rpm * self.overall_ratio(index)
    }

    /// Torque multiplier for gear `index` (reverse multiplier in Reverse).
    #[inline]
    pub fn torque_multiplier(&self, index: u8) -> f64 {
        if index == REVERSE_GEAR {
            self.reverse_multiplier
        } else {
            1.0
        }
    }

    /// Drive direction of gear `index`: +1 forward, −1 reverse, 0 neutral.
    #[inline]
    pub fn direction(&self, index: u8) -> f64 {
        let r = self.ratio(index);
        if r > 0.0 {
            1.0
        } else if r < 0.0 {
            -1.0
        } else {
            0.0
        }
    }

    #[inline]
    pub fn is_forward(&self, index: u8) -> bool {
        index >= FIRST_FORWARD_GEAR && self.contains(index)
    }

    pub fn label(&self, index: u8) -> GearLabel {
        match index {
            REVERSE_GEAR => GearLabel::Reverse,
            NEUTRAL_GEAR => GearLabel::Neutral,
            n => GearLabel::Forward(n - FIRST_FORWARD_GEAR + 1),
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
