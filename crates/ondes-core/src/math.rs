//! Mathematical utility functions for DSP.
//!
//! Allocation-free helpers shared across the engine, suitable for `no_std`.

use libm::{expf, logf};

/// Convert decibels to linear gain.
///
/// # Example
/// ```rust
/// use ondes_core::db_to_linear;
///
/// assert!((db_to_linear(0.0) - 1.0).abs() < 0.001);
/// assert!((db_to_linear(-6.02) - 0.5).abs() < 0.01);
/// ```
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    // 10^(dB/20) = e^(dB * ln(10)/20)
    const FACTOR: f32 = core::f32::consts::LN_10 / 20.0;
    expf(db * FACTOR)
}

/// Convert linear gain to decibels.
///
/// Values ≤ 1e-10 are clamped so silence maps to a large negative number
/// instead of -inf.
///
/// # Example
/// ```rust
/// use ondes_core::linear_to_db;
///
/// assert!((linear_to_db(1.0) - 0.0).abs() < 0.001);
/// assert!((linear_to_db(0.5) - (-6.02)).abs() < 0.01);
/// ```
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    // 20 * log10(linear) = 20 * ln(linear) / ln(10)
    const FACTOR: f32 = 20.0 / core::f32::consts::LN_10;
    logf(linear.max(1e-10)) * FACTOR
}

/// Flush denormal floats to zero.
///
/// IIR filter state decaying toward zero eventually enters the denormal
/// range, where some FPUs fall off their fast path by orders of magnitude.
/// Any magnitude below 1e-20 is inaudible at 32-bit float audio levels.
#[inline]
pub fn flush_denormal(x: f32) -> f32 {
    if x.abs() < 1e-20 { 0.0 } else { x }
}

/// Linear interpolation between two values.
///
/// `t` = 0 returns `a`, `t` = 1 returns `b`.
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn db_roundtrip() {
        for db in [-40, -20, -12, -6, 0, 6, 12] {
            let db = db as f32;
            let linear = db_to_linear(db);
            let back = linear_to_db(linear);
            assert!(
                (back - db).abs() < 0.01,
                "Roundtrip: {db} dB -> {linear} -> {back} dB"
            );
        }
    }

    #[test]
    fn linear_to_db_handles_zero() {
        let db = linear_to_db(0.0);
        assert!(db.is_finite());
        assert!(db < -190.0);
    }

    #[test]
    fn denormal_flushed() {
        assert_eq!(flush_denormal(1e-30), 0.0);
        assert_eq!(flush_denormal(-1e-30), 0.0);
        assert_eq!(flush_denormal(1e-10), 1e-10);
        assert_eq!(flush_denormal(0.5), 0.5);
    }

    #[test]
    fn lerp_endpoints() {
        assert_eq!(lerp(2.0, 6.0, 0.0), 2.0);
        assert_eq!(lerp(2.0, 6.0, 1.0), 6.0);
        assert_eq!(lerp(2.0, 6.0, 0.5), 4.0);
    }
}
