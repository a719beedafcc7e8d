//! One-pole lowpass filter for tone shaping and noise coloring.
//!
//! A single-pole IIR lowpass with the difference equation:
//!
//! ```text
//! y[n] = x[n] + coeff * (y[n-1] - x[n])
//!      = (1 - coeff) * x[n] + coeff * y[n-1]
//! ```
//!
//! where `coeff = exp(-2π * freq / sample_rate)`.
//!
//! This is the simplest possible lowpass: 6 dB/octave rolloff, zero latency,
//! one multiply per sample. The engine uses banks of these to tilt white
//! noise toward red/pink spectra.

use crate::flush_denormal;
use libm::expf;

/// One-pole (6 dB/oct) lowpass filter.
///
/// # Invariants
///
/// - `coeff` is always in [0, 1) for stable operation
/// - `state` is flushed to zero when below 1e-20 (denormal protection)
#[derive(Debug, Clone)]
pub struct OnePole {
    state: f32,
    coeff: f32,
}

impl OnePole {
    /// Create a new one-pole lowpass filter.
    ///
    /// # Arguments
    ///
    /// * `sample_rate` - Sample rate in Hz
    /// * `freq_hz` - Cutoff frequency in Hz (−3 dB point)
    pub fn new(sample_rate: f32, freq_hz: f32) -> Self {
        Self {
            state: 0.0,
            coeff: expf(-core::f32::consts::TAU * freq_hz / sample_rate),
        }
    }

    /// Create a filter directly from a feedback coefficient in [0, 1).
    ///
    /// Used where the cutoff is a fixed fraction of the sample rate and the
    /// coefficient is a precomputed constant (e.g. the noise-color bank).
    pub fn from_coeff(coeff: f32) -> Self {
        Self {
            state: 0.0,
            coeff: coeff.clamp(0.0, 0.9999),
        }
    }

    /// Process one sample through the lowpass filter.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        self.state = flush_denormal(input + self.coeff * (self.state - input));
        self.state
    }

    /// Reset filter state to zero.
    pub fn reset(&mut self) {
        self.state = 0.0;
    }
}
