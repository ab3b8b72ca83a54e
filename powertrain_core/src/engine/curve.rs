//! Piecewise-linear torque curve.

use powertrain_common::consts::MAX_TORQUE_POINTS;
use powertrain_common::powertrain::config::{DEFAULT_TORQUE_CURVE, TorquePoint};

/// Engine torque [Nm] as a function of RPM.
///
/// Linear between control points, flat beyond the first and last point.
/// Built from an already-validated point list.
#[derive(Debug, Clone, PartialEq)]
pub struct TorqueCurve {
    points: heapless::Vec<TorquePoint, MAX_TORQUE_POINTS>,
}

impl Default for TorqueCurve {
    fn default() -> Self {
        Self::from_points(&DEFAULT_TORQUE_CURVE)
    }
}

impl TorqueCurve {
    /// Build from control points sorted by RPM.
    ///
    /// Points beyond capacity are ignored; an empty list yields the stock
    /// curve.
    pub fn from_points(points: &[TorquePoint]) -> Self {
        let src = if points.is_empty() { &DEFAULT_TORQUE_CURVE[..] } else { points };
        let mut out = heapless::Vec::new();
        for &p in src.iter().take(MAX_TORQUE_POINTS) {
            // Capacity checked by take().
            let _ = out.push(p);
        }
        Self { points: out }
    }

    /// Torque available at `rpm`.
    pub fn torque_at(&self, rpm: f64) -> f64 {
        let pts = &self.points;
        let (Some(first), Some(last)) = (pts.first(), pts.last()) else {
            return 0.0;
        };
        if !rpm.is_finite() || rpm <= first.rpm {
            return first.nm;
        }
        if rpm >= last.rpm {
            return last.nm;
        }
        // First point strictly above rpm; guaranteed to exist and be > 0.
        let hi = pts.partition_point(|p| p.rpm <= rpm);
        let (a, b) = (pts[hi - 1], pts[hi]);
        let t = (rpm - a.rpm) / (b.rpm - a.rpm);
        a.nm + (b.nm - a.nm) * t
    }
}
