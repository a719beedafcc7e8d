//! Resonant ladder filter with pole-mixing outputs.
//!
//! Four cascaded one-pole lowpass stages with global feedback, the classic
//! analog ladder topology. Each stage runs the recurrence
//!
//! ```text
//! y[n] = b0·x[n] + b1·x[n-1] − a1·y[n-1]
//! ```
//!
//! and the output is a linear combination of the five internal taps (the
//! post-feedback input plus the four stage outputs). The mix rows are
//! finite-difference expansions of the cascaded lowpass taps, e.g. a
//! first-order highpass is `t0 − t1`, a second-order notch is
//! `t0 − 2t1 + 2t2`, giving nineteen selectable responses from one set of
//! state variables.
//!
//! The recurrence runs at an oversampled effective rate when the cutoff
//! ratio gets high, keeping the one-pole coefficient in its stable range,
//! and the feedback path passes through a soft-saturating tanh so high
//! resonance rings instead of blowing up.

use libm::{ceilf, expf};
use ondes_core::{fast_tanh, flush_denormal};

/// Filter response selector.
///
/// Names encode the pole mix: `Lp`/`Hp` orders 1–4, band-passes as
/// lowpass/highpass combinations, notches, and third-order allpass
/// (phase-shift) blends.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FilterMode {
    /// 1-pole lowpass, 6 dB/oct.
    #[default]
    Lp1,
    /// 2-pole lowpass, 12 dB/oct.
    Lp2,
    /// 3-pole lowpass, 18 dB/oct.
    Lp3,
    /// 4-pole lowpass, 24 dB/oct.
    Lp4,
    /// 1-pole highpass.
    Hp1,
    /// 2-pole highpass.
    Hp2,
    /// 3-pole highpass.
    Hp3,
    /// 4-pole highpass.
    Hp4,
    /// Band-pass, one pole each side.
    Bp2,
    /// Band-pass, two poles each side.
    Bp4,
    /// Band-pass shifted low (two lowpass poles, one highpass).
    Bp2Lp1,
    /// Band-pass shifted lower (three lowpass poles, one highpass).
    Bp2Lp2,
    /// Band-pass shifted high (one lowpass pole, two highpass).
    Bp2Hp1,
    /// 2-pole notch (band-reject).
    Notch2,
    /// Notch with an extra lowpass pole.
    Notch2Lp1,
    /// 4-pole notch.
    Notch4,
    /// 2-pole allpass (phase shift).
    Ap2,
    /// 3-pole allpass (phase shifter).
    Ap3,
    /// 3-pole allpass with an extra lowpass pole.
    Ap3Lp1,
}

impl FilterMode {
    /// All nineteen modes in declaration order.
    pub const ALL: [FilterMode; 19] = [
        FilterMode::Lp1,
        FilterMode::Lp2,
        FilterMode::Lp3,
        FilterMode::Lp4,
        FilterMode::Hp1,
        FilterMode::Hp2,
        FilterMode::Hp3,
        FilterMode::Hp4,
        FilterMode::Bp2,
        FilterMode::Bp4,
        FilterMode::Bp2Lp1,
        FilterMode::Bp2Lp2,
        FilterMode::Bp2Hp1,
        FilterMode::Notch2,
        FilterMode::Notch2Lp1,
        FilterMode::Notch4,
        FilterMode::Ap2,
        FilterMode::Ap3,
        FilterMode::Ap3Lp1,
    ];

    /// The constant tap-mix row for this mode: `[input, lp1, lp2, lp3, lp4]`.
    pub fn mix_row(self) -> [f32; 5] {
        match self {
            FilterMode::Lp1 => [0.0, 1.0, 0.0, 0.0, 0.0],
            FilterMode::Lp2 => [0.0, 0.0, 1.0, 0.0, 0.0],
            FilterMode::Lp3 => [0.0, 0.0, 0.0, 1.0, 0.0],
            FilterMode::Lp4 => [0.0, 0.0, 0.0, 0.0, 1.0],
            FilterMode::Hp1 => [1.0, -1.0, 0.0, 0.0, 0.0],
            FilterMode::Hp2 => [1.0, -2.0, 1.0, 0.0, 0.0],
            FilterMode::Hp3 => [1.0, -3.0, 3.0, -1.0, 0.0],
            FilterMode::Hp4 => [1.0, -4.0, 6.0, -4.0, 1.0],
            FilterMode::Bp2 => [0.0, 1.0, -1.0, 0.0, 0.0],
            FilterMode::Bp4 => [0.0, 0.0, 1.0, -2.0, 1.0],
            FilterMode::Bp2Lp1 => [0.0, 0.0, 1.0, -1.0, 0.0],
            FilterMode::Bp2Lp2 => [0.0, 0.0, 0.0, 1.0, -1.0],
            FilterMode::Bp2Hp1 => [0.0, 1.0, -2.0, 1.0, 0.0],
            FilterMode::Notch2 => [1.0, -2.0, 2.0, 0.0, 0.0],
            FilterMode::Notch2Lp1 => [0.0, 1.0, -2.0, 2.0, 0.0],
            FilterMode::Notch4 => [1.0, -4.0, 6.0, -4.0, 2.0],
            FilterMode::Ap2 => [1.0, -4.0, 4.0, 0.0, 0.0],
            FilterMode::Ap3 => [1.0, -6.0, 12.0, -8.0, 0.0],
            FilterMode::Ap3Lp1 => [0.0, 1.0, -6.0, 12.0, -8.0],
        }
    }
}

/// Filter parameters shared by all voices.
///
/// The mix row is cached when the mode is set so the per-sample dot product
/// never goes through the mode match.
#[derive(Clone, Copy, Debug)]
pub struct FilterConfig {
    enabled: bool,
    mode: FilterMode,
    mix_row: [f32; 5],
    cutoff_hz: f32,
    resonance: f32,
    env_octaves: f32,
    key_follow: f32,
    velocity_tracking: f32,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            mode: FilterMode::Lp4,
            mix_row: FilterMode::Lp4.mix_row(),
            cutoff_hz: 2000.0,
            resonance: 0.2,
            env_octaves: 2.0,
            key_follow: 0.0,
            velocity_tracking: 0.0,
        }
    }
}

impl FilterConfig {
    /// Enable or bypass the filter stage.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Whether the filter is in the signal path.
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Select the filter response, refreshing the cached mix row.
    pub fn set_mode(&mut self, mode: FilterMode) {
        self.mode = mode;
        self.mix_row = mode.mix_row();
    }

    /// Current filter response.
    pub fn mode(&self) -> FilterMode {
        self.mode
    }

    /// Cached tap-mix row for the current mode.
    pub fn mix_row(&self) -> [f32; 5] {
        self.mix_row
    }

    /// Set the base cutoff in Hz, clamped to [20, 20000].
    ///
    /// The per-voice setup clamps again against the actual Nyquist.
    pub fn set_cutoff_hz(&mut self, hz: f32) {
        self.cutoff_hz = hz.clamp(20.0, 20000.0);
    }

    /// Base cutoff actually used (clamped).
    pub fn cutoff_hz(&self) -> f32 {
        self.cutoff_hz
    }

    /// Set resonance in [0, 1]. Zero reduces the ladder to a plain cascade.
    pub fn set_resonance(&mut self, amount: f32) {
        self.resonance = amount.clamp(0.0, 1.0);
    }

    /// Resonance actually used (clamped).
    pub fn resonance(&self) -> f32 {
        self.resonance
    }

    /// Set the filter-envelope sweep range in octaves, clamped to ±8.
    pub fn set_env_octaves(&mut self, octaves: f32) {
        self.env_octaves = octaves.clamp(-8.0, 8.0);
    }

    /// Envelope sweep range in octaves.
    pub fn env_octaves(&self) -> f32 {
        self.env_octaves
    }

    /// Set keyboard tracking in [0, 1]: 1 moves the cutoff a full octave
    /// per played octave.
    pub fn set_key_follow(&mut self, amount: f32) {
        self.key_follow = amount.clamp(0.0, 1.0);
    }

    /// Keyboard tracking amount.
    pub fn key_follow(&self) -> f32 {
        self.key_follow
    }

    /// Set velocity-to-cutoff tracking in [0, 1].
    pub fn set_velocity_tracking(&mut self, amount: f32) {
        self.velocity_tracking = amount.clamp(0.0, 1.0);
    }

    /// Velocity tracking amount.
    pub fn velocity_tracking(&self) -> f32 {
        self.velocity_tracking
    }
}

// Feedback gain at full resonance. Four one-pole stages contribute 45° of
// phase each at cutoff; k = 4 puts the loop at the edge of oscillation.
const FEEDBACK_GAIN: f32 = 4.0;

/// Oversample factor needed to keep a normalized cutoff ratio stable.
///
/// `fc_base` is the cutoff as a fraction of Nyquist; the ladder recurrence
/// wants its per-iteration ratio at or below 0.25.
#[inline]
fn oversample_factor(fc_base: f32) -> u32 {
    let n = ceilf(fc_base / 0.25);
    (n as u32).clamp(1, 8)
}

/// Per-voice ladder filter state.
///
/// `setup` must run before `process` whenever cutoff, resonance or sample
/// rate changed; stale coefficients produce a response nobody asked for.
/// `reset` must run when the voice retriggers, or the previous note's
/// filter memory clicks into the new one.
#[derive(Clone, Copy, Debug)]
pub struct LadderFilter {
    taps: [f32; 5],
    b0: f32,
    b1: f32,
    a1: f32,
    feedback: f32,
    oversample: u32,
    cutoff_hz: f32,
}

impl Default for LadderFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl LadderFilter {
    /// Fresh filter with zeroed state and neutral coefficients.
    pub fn new() -> Self {
        let mut f = Self {
            taps: [0.0; 5],
            b0: 0.0,
            b1: 0.0,
            a1: 0.0,
            feedback: 0.0,
            oversample: 1,
            cutoff_hz: 1000.0,
        };
        f.setup(1000.0, 0.0, 48000.0);
        f
    }

    /// Recompute stage and feedback coefficients.
    ///
    /// The normalized ratio `fc = 2·cutoff/sample_rate / oversample` feeds
    /// the one-pole coefficient `g = 1 − exp(−π·fc)`; the oversample factor
    /// is chosen so the per-iteration ratio stays at or below 0.25.
    pub fn setup(&mut self, cutoff_hz: f32, resonance: f32, sample_rate: f32) {
        let cutoff = cutoff_hz.clamp(10.0, sample_rate * 0.45);
        let fc_base = 2.0 * cutoff / sample_rate;
        self.oversample = oversample_factor(fc_base);
        let fc = (fc_base / self.oversample as f32).min(1.0);
        let g = 1.0 - expf(-core::f32::consts::PI * fc);
        // One-pole with a zero at 0.3 of the input history; unity DC gain.
        self.b0 = g / 1.3;
        self.b1 = g * 0.3 / 1.3;
        self.a1 = g - 1.0;
        self.feedback = FEEDBACK_GAIN * resonance.clamp(0.0, 1.0);
        self.cutoff_hz = cutoff;
    }

    /// Run one output sample through the oversampled ladder recurrence and
    /// mix the five taps by `row`.
    #[inline]
    pub fn process(&mut self, input: f32, row: [f32; 5]) -> f32 {
        for _ in 0..self.oversample {
            let prev = self.taps;
            // Global feedback, soft-saturated so high resonance rings
            // instead of clipping hard or running away.
            self.taps[0] = input - self.feedback * fast_tanh(prev[4]);
            for i in 0..4 {
                self.taps[i + 1] = flush_denormal(
                    self.b0 * self.taps[i] + self.b1 * prev[i] - self.a1 * prev[i + 1],
                );
            }
        }
        let t = &self.taps;
        row[0] * t[0] + row[1] * t[1] + row[2] * t[2] + row[3] * t[3] + row[4] * t[4]
    }

    /// Zero all internal state. Call on voice retrigger.
    pub fn reset(&mut self) {
        self.taps = [0.0; 5];
    }

    /// Effective cutoff in Hz after clamping, for display snapshots.
    pub fn cutoff_hz(&self) -> f32 {
        self.cutoff_hz
    }

    /// Current oversample factor (≥ 1).
    pub fn oversample(&self) -> u32 {
        self.oversample
    }
}
