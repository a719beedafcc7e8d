//! Low-frequency oscillator for modulation.
//!
//! Provides the shared modulation source for vibrato, filter sweeps,
//! tremolo and pulse-width movement. The engine advances it at control-rate
//! granularity via [`Lfo::tick`], so a single call covers a whole sub-block
//! of samples; modulation keeps running even while every voice is silent.

use core::f32::consts::PI;
use libm::{floorf, sinf};

/// LFO waveform type
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LfoWaveform {
    /// Smooth, natural modulation.
    #[default]
    Sine,
    /// Linear ramps, harder corners than sine.
    Triangle,
    /// Rising ramp with an abrupt reset.
    Saw,
    /// Binary on/off modulation.
    Square,
    /// Random stepped values, renewed once per cycle.
    SampleAndHold,
}

/// Low-frequency oscillator generating values in [-1, 1].
///
/// Uses phase accumulation in [0, 1). Sub-audio rates only; there is no
/// band-limiting, which is fine below ~20 Hz.
///
/// # Example
///
/// ```rust
/// use ondes_core::{Lfo, LfoWaveform};
///
/// let mut lfo = Lfo::new(48000.0, 2.0); // 2 Hz
/// lfo.set_waveform(LfoWaveform::Triangle);
///
/// // Advance 16 samples at once (one control tick)
/// let value = lfo.tick(16);
/// assert!((-1.0..=1.0).contains(&value));
/// ```
#[derive(Debug, Clone)]
pub struct Lfo {
    /// Current phase position [0.0, 1.0)
    phase: f32,
    /// Phase increment per sample
    phase_inc: f32,
    /// Sample rate in Hz
    sample_rate: f32,
    /// Waveform type
    waveform: LfoWaveform,
    /// For Sample & Hold: current held value
    sh_value: f32,
    /// For Sample & Hold: PRNG state
    sh_rng: u32,
}

impl Default for Lfo {
    fn default() -> Self {
        Self::new(48000.0, 1.0)
    }
}

impl Lfo {
    /// Create a new LFO with the given sample rate and frequency.
    pub fn new(sample_rate: f32, freq_hz: f32) -> Self {
        Self {
            phase: 0.0,
            phase_inc: freq_hz / sample_rate,
            sample_rate,
            waveform: LfoWaveform::Sine,
            sh_value: 0.0,
            sh_rng: 0x9e3779b9,
        }
    }

    /// Set frequency in Hz.
    pub fn set_frequency(&mut self, freq_hz: f32) {
        self.phase_inc = freq_hz.max(0.0) / self.sample_rate;
    }

    /// Get current frequency in Hz.
    pub fn frequency(&self) -> f32 {
        self.phase_inc * self.sample_rate
    }

    /// Set waveform.
    pub fn set_waveform(&mut self, waveform: LfoWaveform) {
        self.waveform = waveform;
    }

    /// Get current waveform.
    pub fn waveform(&self) -> LfoWaveform {
        self.waveform
    }

    /// Reset phase to 0.
    pub fn reset(&mut self) {
        self.phase = 0.0;
    }

    /// Sync phase to a specific value (0.0 - 1.0).
    pub fn set_phase(&mut self, phase: f32) {
        self.phase = phase.clamp(0.0, 1.0);
    }

    /// Get current phase (0.0 - 1.0).
    pub fn phase(&self) -> f32 {
        self.phase
    }

    /// Advance by `samples` samples and return the value at the new phase.
    ///
    /// This is the control-rate entry point: the engine calls it once per
    /// sub-block with the number of samples just elapsed, so the LFO costs
    /// one evaluation per tick rather than one per sample.
    #[inline]
    pub fn tick(&mut self, samples: u32) -> f32 {
        self.phase += self.phase_inc * samples as f32;
        if self.phase >= 1.0 {
            self.phase -= floorf(self.phase);
            // Renew the held value once per wrap
            if self.waveform == LfoWaveform::SampleAndHold {
                self.sh_value = self.next_random();
            }
        }
        self.value()
    }

    /// Advance one sample and return the new value.
    #[inline]
    pub fn next(&mut self) -> f32 {
        self.tick(1)
    }

    /// Current output without advancing.
    pub fn value(&self) -> f32 {
        match self.waveform {
            LfoWaveform::Sine => sinf(self.phase * 2.0 * PI),

            LfoWaveform::Triangle => {
                if self.phase < 0.5 {
                    4.0 * self.phase - 1.0
                } else {
                    3.0 - 4.0 * self.phase
                }
            }

            LfoWaveform::Saw => 2.0 * self.phase - 1.0,

            LfoWaveform::Square => {
                if self.phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }

            LfoWaveform::SampleAndHold => self.sh_value,
        }
    }

    /// Set sample rate, preserving the configured frequency.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        let freq = self.phase_inc * self.sample_rate;
        self.sample_rate = sample_rate;
        self.set_frequency(freq);
    }

    fn next_random(&mut self) -> f32 {
        // xorshift32
        let mut x = self.sh_rng;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.sh_rng = x;
        (x as f32 / u32::MAX as f32) * 2.0 - 1.0
    }
}
