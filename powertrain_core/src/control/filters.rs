//! Signal conditioning helpers shared by the gearbox and driveline.
//!
//! First-order low-pass (time-constant form), exponential approach, and a
//! rate (slew) limiter. A non-positive time constant or rate disables the
//! corresponding stage.

use powertrain_common::consts::MIN_DIVISOR;

// ─── Low-Pass Filter (1st-order) ────────────────────────────────────

/// Internal state of the 1st-order low-pass filter.
///
/// Unprimed filters adopt the first sample as their output so a fresh
/// filter does not drag the signal up from zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct LowPassState {
    prev_output: f64,
    primed: bool,
}

impl LowPassState {
    /// Reset filter state; the next sample primes it again.
    #[inline]
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Force the filter output to `value`.
    #[inline]
    pub fn seed(&mut self, value: f64) {
        self.prev_output = value;
        self.primed = true;
    }

    /// Last filter output.
    #[inline]
    pub const fn output(&self) -> f64 {
        self.prev_output
    }

    /// Apply one sample.
    ///
    /// ```text
    /// alpha = dt / (tau + dt)
    /// y[n]  = y[n-1] + alpha × (x[n] - y[n-1])
    /// ```
    ///
    /// Returns `input` unchanged when `tau <= 0.0` (disabled).
    #[inline]
    pub fn apply(&mut self, input: f64, tau: f64, dt: f64) -> f64 {
        if !self.primed || tau <= 0.0 || dt <= 0.0 {
            self.seed(input);
            return input;
        }
        let alpha = dt / (tau + dt);
        self.prev_output += alpha * (input - self.prev_output);
        self.prev_output
    }
}

// ─── Exponential Approach ───────────────────────────────────────────

/// Move `current` toward `target` with time constant `tau` over `dt`.
///
/// Exact discretisation of `dx/dt = (target − x) / tau`; never overshoots.
#[inline]
pub fn approach(current: f64, target: f64, tau: f64, dt: f64) -> f64 {
    if dt <= 0.0 {
        return current;
    }
    let k = 1.0 - (-dt / tau.max(MIN_DIVISOR)).exp();
    current + (target - current) * k
}

// ─── Slew Limiter ───────────────────────────────────────────────────

/// Limit the change from `prev` to `target` to `rate × dt`.
///
/// Returns `target` unchanged when `rate <= 0.0` (disabled).
#[inline]
pub fn slew(prev: f64, target: f64, rate: f64, dt: f64) -> f64 {
    if rate <= 0.0 || dt <= 0.0 {
        return target;
    }
    let max_step = rate * dt;
    prev + (target - prev).clamp(-max_step, max_step)
}

// ─── Interpolation ──────────────────────────────────────────────────

/// Linear interpolation; `t` is clamped to [0, 1].
#[inline]
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t.clamp(0.0, 1.0)
}

/// Fraction of `value` across `[start, end]`, clamped to [0, 1].
#[inline]
pub fn ramp(value: f64, start: f64, end: f64) -> f64 {
    let span = end - start;
    if span.abs() < MIN_DIVISOR {
        return if value >= end { 1.0 } else { 0.0 };
    }
    ((value - start) / span).clamp(0.0, 1.0)
}

// ─── Tests ──────────────────────────────────────────────────────────
