//! A single synthesizer voice: oscillators, sub-oscillator, filter and
//! envelopes wired in the fixed order the engine renders them.
//!
//! The voice holds only mutable per-note state; all parameters live in the
//! engine's [`Patch`](crate::engine::Patch) and are read on every call, so
//! a parameter edit is heard by already-sounding notes.

use libm::powf;
use ondes_core::fast_exp2;

use crate::engine::{Patch, SubOscMode};
use crate::envelope::{AdsrEnvelope, EnvelopeStage};
use crate::filter::LadderFilter;
use crate::oscillator::OscillatorState;

/// Oscillator slots per voice.
pub const OSCS_PER_VOICE: usize = 2;

/// Per-slot aggregate of everything one sounding note needs.
#[derive(Debug, Clone, Default)]
pub struct Voice {
    note: u8,
    velocity: u8,
    oscs: [OscillatorState; OSCS_PER_VOICE],
    filter: LadderFilter,
    amp_env: AdsrEnvelope,
    filter_env: AdsrEnvelope,

    // Control-rate cache, refreshed by `update_control`; the per-sample
    // loop never re-derives these.
    steps: [f32; OSCS_PER_VOICE],
    tremolo: f32,
    level_scale: f32,
}

impl Voice {
    /// Fresh silent voice.
    pub fn new() -> Self {
        Self {
            tremolo: 1.0,
            ..Self::default()
        }
    }

    /// Begin a note: record note and velocity, reset every oscillator
    /// phase and the filter memory, and gate both envelopes on.
    ///
    /// A retrigger of the same note mid-release goes through here too:
    /// phase and filter state restart even though the pairing is nominally
    /// unchanged.
    pub fn start(&mut self, patch: &Patch, note: u8, velocity: u8) {
        self.note = note;
        self.velocity = velocity;
        for osc in &mut self.oscs {
            osc.reset();
        }
        self.filter.reset();
        self.amp_env.gate(&patch.amp_env, true);
        self.filter_env.gate(&patch.filter_env, true);
        self.level_scale =
            patch.amp.base() + velocity_gain(velocity) * patch.amp.velocity_sensitivity();
    }

    /// Release the note: gate both envelopes off. The voice keeps sounding
    /// through the release tail and frees itself when the amplitude
    /// envelope reaches Off.
    pub fn release(&mut self, patch: &Patch) {
        self.amp_env.gate(&patch.amp_env, false);
        self.filter_env.gate(&patch.filter_env, false);
    }

    /// Silence the voice immediately, skipping the release tail.
    pub fn kill(&mut self) {
        self.amp_env.reset();
        self.filter_env.reset();
    }

    /// Whether the amplitude envelope is still producing output.
    pub fn is_active(&self) -> bool {
        self.amp_env.is_active()
    }

    /// Note number currently (or last) assigned to this voice.
    pub fn note(&self) -> u8 {
        self.note
    }

    /// Velocity of the current note.
    pub fn velocity(&self) -> u8 {
        self.velocity
    }

    /// Amplitude envelope stage, for display.
    pub fn amp_stage(&self) -> EnvelopeStage {
        self.amp_env.stage()
    }

    /// Amplitude envelope level, for display and voice stealing.
    pub fn amp_level(&self) -> f32 {
        self.amp_env.level()
    }

    /// Effective filter cutoff after modulation, for display.
    pub fn cutoff_hz(&self) -> f32 {
        self.filter.cutoff_hz()
    }

    /// Control-rate update: recompute oscillator steps from pitch bend,
    /// key frequency, frequency ratio and LFO vibrato; refresh pulse-width
    /// and tremolo modulation; and set up the filter coefficients from
    /// cutoff + envelope + LFO + velocity + key follow.
    pub fn update_control(
        &mut self,
        patch: &Patch,
        sample_rate: f32,
        bend_ratio: f32,
        lfo_value: f32,
    ) {
        let key_freq = midi_to_freq(self.note);
        let vibrato = fast_exp2(lfo_value * patch.lfo.vibrato_semitones() / 12.0);
        let dt = 1.0 / sample_rate;

        for (i, osc) in self.oscs.iter_mut().enumerate() {
            let cfg = &patch.osc[i];
            self.steps[i] =
                key_freq * cfg.frequency_ratio() * cfg.freq_scale() * bend_ratio * vibrato * dt;
            osc.set_shape_mod(lfo_value * patch.lfo.shape_depth());
        }

        // Tremolo dips below unity; an LFO at +1 leaves the level untouched.
        self.tremolo = 1.0 - patch.lfo.tremolo_depth() * 0.5 * (1.0 - lfo_value);

        if patch.filter.enabled() {
            let octaves = patch.filter.env_octaves() * self.filter_env.level()
                + patch.lfo.filter_octaves() * lfo_value
                + patch.filter.key_follow() * (f32::from(self.note) - 60.0) / 12.0;
            let vel = 1.0
                + patch.filter.velocity_tracking() * (velocity_gain(self.velocity) - 1.0);
            let cutoff = patch.filter.cutoff_hz() * fast_exp2(octaves) * vel;
            self.filter
                .setup(cutoff, patch.filter.resonance(), sample_rate);
        }
    }

    /// Produce one sample: advance the amplitude envelope (the engine
    /// checks [`Voice::is_active`] afterward and retires the voice if it
    /// just reached Off), sum the oscillators and sub-oscillator, run the
    /// ladder if enabled, and scale by the amplifier curve.
    #[inline]
    pub fn render_sample(&mut self, patch: &Patch, dt: f32) -> f32 {
        let amp = self.amp_env.advance(&patch.amp_env, dt);
        if !self.amp_env.is_active() {
            return 0.0;
        }
        self.filter_env.advance(&patch.filter_env, dt);

        let mut sample = 0.0;
        for (i, osc) in self.oscs.iter_mut().enumerate() {
            let cfg = &patch.osc[i];
            if cfg.amplitude() > 0.0 {
                sample += osc.advance(cfg, self.steps[i]) * cfg.amplitude();
            }
        }

        if patch.sub.level() > 0.0 {
            sample += sub_sample(self.oscs[0].cycles(), patch.sub.mode()) * patch.sub.level();
        }

        if patch.filter.enabled() {
            sample = self.filter.process(sample, patch.filter.mix_row());
        }

        sample * amp * self.level_scale * self.tremolo
    }
}

/// Sub-oscillator sample from the master oscillator's cycle counter.
///
/// Square and pulse patterns read straight off the counter bits, the way
/// divide-down sub-oscillators tap a phase counter.
#[inline]
fn sub_sample(cycles: u32, mode: SubOscMode) -> f32 {
    let high = match mode {
        SubOscMode::Square1Oct => cycles & 1 == 0,
        SubOscMode::Square2Oct => cycles & 2 == 0,
        SubOscMode::Pulse2Oct => cycles & 3 == 0,
    };
    if high { 1.0 } else { -1.0 }
}

/// Convert MIDI note number to frequency in Hz.
///
/// Uses standard tuning: A4 (note 69) = 440 Hz.
#[inline]
pub fn midi_to_freq(note: u8) -> f32 {
    440.0 * powf(2.0, (f32::from(note) - 69.0) / 12.0)
}

/// Map MIDI velocity 0–127 to a gain multiplier in 0..≈2.
#[inline]
pub fn velocity_gain(velocity: u8) -> f32 {
    f32::from(velocity) / 64.0
}
