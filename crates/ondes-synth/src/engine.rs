//! The synthesis engine: explicit configuration state, voice allocation,
//! and the per-block audio loop.
//!
//! One [`SynthEngine`] owns everything: the [`Patch`] (every parameter the
//! voices read), the fixed voice pool, the note→voice reverse map, the
//! shared LFO, and the control-message receiver. The audio thread calls
//! [`SynthEngine::render`] once per block; input threads either call the
//! note/parameter methods between blocks or push
//! [`ControlMessage`](crate::message::ControlMessage)s through the SPSC
//! channel, which the engine drains at the block boundary.
//!
//! Inside a block the engine runs a two-rate scheme: every
//! [`CONTROL_INTERVAL`] samples it advances the LFO and refreshes each
//! active voice's cached steps and filter coefficients; the per-sample loop
//! just advances envelopes, evaluates oscillators and accumulates. The
//! active-voice list is rebuilt at the start of every block and compacted
//! in place (swap-with-last) when a voice's envelope reaches Off mid-block.

use libm::exp2f;
use ondes_core::{Lfo, LfoWaveform};

use crate::envelope::{EnvelopeConfig, EnvelopeStage};
use crate::filter::FilterConfig;
use crate::oscillator::OscillatorConfig;
use crate::voice::{OSCS_PER_VOICE, Voice};

#[cfg(feature = "rtrb")]
use crate::message::ControlMessage;

/// Samples between control-rate updates of LFO and filter coefficients.
pub const CONTROL_INTERVAL: usize = 16;

/// Default size of the voice pool.
pub const DEFAULT_VOICES: usize = 16;

/// Sub-oscillator pattern, read off the master oscillator's cycle counter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SubOscMode {
    /// Square wave one octave below oscillator 1.
    #[default]
    Square1Oct,
    /// Square wave two octaves below oscillator 1.
    Square2Oct,
    /// 25% pulse two octaves below oscillator 1.
    Pulse2Oct,
}

/// Sub-oscillator parameters.
#[derive(Clone, Copy, Debug, Default)]
pub struct SubOscConfig {
    mode: SubOscMode,
    level: f32,
}

impl SubOscConfig {
    /// Select the sub-oscillator pattern.
    pub fn set_mode(&mut self, mode: SubOscMode) {
        self.mode = mode;
    }

    /// Current pattern.
    pub fn mode(&self) -> SubOscMode {
        self.mode
    }

    /// Set the mix level, clamped to [0, 1]. Zero removes the sub entirely.
    pub fn set_level(&mut self, level: f32) {
        self.level = level.clamp(0.0, 1.0);
    }

    /// Mix level actually used (clamped).
    pub fn level(&self) -> f32 {
        self.level
    }
}

/// Shared LFO parameters and modulation depths.
#[derive(Clone, Copy, Debug)]
pub struct LfoConfig {
    rate_hz: f32,
    waveform: LfoWaveform,
    vibrato_semitones: f32,
    filter_octaves: f32,
    tremolo_depth: f32,
    shape_depth: f32,
}

impl Default for LfoConfig {
    fn default() -> Self {
        Self {
            rate_hz: 5.0,
            waveform: LfoWaveform::Sine,
            vibrato_semitones: 0.0,
            filter_octaves: 0.0,
            tremolo_depth: 0.0,
            shape_depth: 0.0,
        }
    }
}

impl LfoConfig {
    /// Set the LFO rate in Hz, clamped to [0, 40].
    pub fn set_rate_hz(&mut self, hz: f32) {
        self.rate_hz = hz.clamp(0.0, 40.0);
    }

    /// LFO rate actually used (clamped).
    pub fn rate_hz(&self) -> f32 {
        self.rate_hz
    }

    /// Select the LFO waveform.
    pub fn set_waveform(&mut self, waveform: LfoWaveform) {
        self.waveform = waveform;
    }

    /// Current LFO waveform.
    pub fn waveform(&self) -> LfoWaveform {
        self.waveform
    }

    /// Set vibrato depth in semitones, clamped to [0, 12].
    pub fn set_vibrato_semitones(&mut self, semitones: f32) {
        self.vibrato_semitones = semitones.clamp(0.0, 12.0);
    }

    /// Vibrato depth in semitones.
    pub fn vibrato_semitones(&self) -> f32 {
        self.vibrato_semitones
    }

    /// Set filter sweep depth in octaves, clamped to ±4.
    pub fn set_filter_octaves(&mut self, octaves: f32) {
        self.filter_octaves = octaves.clamp(-4.0, 4.0);
    }

    /// Filter sweep depth in octaves.
    pub fn filter_octaves(&self) -> f32 {
        self.filter_octaves
    }

    /// Set tremolo depth, clamped to [0, 1].
    pub fn set_tremolo_depth(&mut self, depth: f32) {
        self.tremolo_depth = depth.clamp(0.0, 1.0);
    }

    /// Tremolo depth.
    pub fn tremolo_depth(&self) -> f32 {
        self.tremolo_depth
    }

    /// Set waveform-shape (pulse width / noise color) modulation depth,
    /// clamped to [0, 0.45].
    pub fn set_shape_depth(&mut self, depth: f32) {
        self.shape_depth = depth.clamp(0.0, 0.45);
    }

    /// Shape modulation depth.
    pub fn shape_depth(&self) -> f32 {
        self.shape_depth
    }
}

/// Output amplifier parameters.
#[derive(Clone, Copy, Debug)]
pub struct AmplifierConfig {
    base: f32,
    velocity_sensitivity: f32,
    master_gain: f32,
}

impl Default for AmplifierConfig {
    fn default() -> Self {
        Self {
            base: 0.5,
            velocity_sensitivity: 0.3,
            master_gain: 0.25,
        }
    }
}

impl AmplifierConfig {
    /// Set the velocity-independent level term, clamped to [0, 2].
    pub fn set_base(&mut self, base: f32) {
        self.base = base.clamp(0.0, 2.0);
    }

    /// Velocity-independent level term.
    pub fn base(&self) -> f32 {
        self.base
    }

    /// Set how much velocity contributes to the level, clamped to [0, 2].
    pub fn set_velocity_sensitivity(&mut self, sensitivity: f32) {
        self.velocity_sensitivity = sensitivity.clamp(0.0, 2.0);
    }

    /// Velocity contribution to the level.
    pub fn velocity_sensitivity(&self) -> f32 {
        self.velocity_sensitivity
    }

    /// Set the global output gain, clamped to [0, 4].
    pub fn set_master_gain(&mut self, gain: f32) {
        self.master_gain = gain.clamp(0.0, 4.0);
    }

    /// Global output gain.
    pub fn master_gain(&self) -> f32 {
        self.master_gain
    }
}

/// The complete engine configuration, owned by the [`SynthEngine`] and read
/// by every synthesis call.
///
/// Each sub-config clamps its own inputs in its setters, so handing out
/// `&mut Patch` can never put an out-of-range value into the signal path.
#[derive(Clone, Copy, Debug)]
pub struct Patch {
    /// Per-slot oscillator parameters.
    pub osc: [OscillatorConfig; OSCS_PER_VOICE],
    /// Sub-oscillator pattern and level.
    pub sub: SubOscConfig,
    /// Amplitude envelope timing.
    pub amp_env: EnvelopeConfig,
    /// Filter envelope timing.
    pub filter_env: EnvelopeConfig,
    /// Shared filter parameters.
    pub filter: FilterConfig,
    /// Shared LFO parameters and modulation depths.
    pub lfo: LfoConfig,
    /// Output amplifier parameters.
    pub amp: AmplifierConfig,
}

impl Default for Patch {
    fn default() -> Self {
        let mut patch = Self {
            osc: [OscillatorConfig::default(); OSCS_PER_VOICE],
            sub: SubOscConfig::default(),
            amp_env: EnvelopeConfig::default(),
            filter_env: EnvelopeConfig::default(),
            filter: FilterConfig::default(),
            lfo: LfoConfig::default(),
            amp: AmplifierConfig::default(),
        };
        // Only the first oscillator sounds out of the box.
        patch.osc[1].set_amplitude(0.0);
        patch
    }
}

/// Read-only view of one voice for meters and menus.
#[derive(Clone, Copy, Debug)]
pub struct VoiceSnapshot {
    /// Note currently (or last) assigned to the voice.
    pub note: u8,
    /// Velocity of that note.
    pub velocity: u8,
    /// Amplitude envelope stage.
    pub stage: EnvelopeStage,
    /// Amplitude envelope level in [0, 1].
    pub level: f32,
    /// Effective filter cutoff after modulation, in Hz.
    pub cutoff_hz: f32,
}

/// The polyphonic synthesis engine.
///
/// `VOICES` fixes the pool size at compile time; 16 is the conventional
/// choice. All synthesis state lives inside this one object, no globals.
pub struct SynthEngine<const VOICES: usize = DEFAULT_VOICES> {
    patch: Patch,
    voices: [Voice; VOICES],
    note_to_voice: [Option<u8>; 128],
    active: [u8; VOICES],
    active_len: usize,
    lfo: Lfo,
    lfo_value: f32,
    bend_semitones: f32,
    bend_ratio: f32,
    sample_rate: f32,
    #[cfg(feature = "rtrb")]
    receiver: Option<rtrb::Consumer<ControlMessage>>,
}

impl<const VOICES: usize> SynthEngine<VOICES> {
    /// Create an engine with default patch settings.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            patch: Patch::default(),
            voices: core::array::from_fn(|_| Voice::new()),
            note_to_voice: [None; 128],
            active: [0; VOICES],
            active_len: 0,
            lfo: Lfo::new(sample_rate, 5.0),
            lfo_value: 0.0,
            bend_semitones: 0.0,
            bend_ratio: 1.0,
            sample_rate,
            #[cfg(feature = "rtrb")]
            receiver: None,
        }
    }

    /// Hand the engine the consumer side of the control channel.
    #[cfg(feature = "rtrb")]
    pub fn attach_receiver(&mut self, receiver: rtrb::Consumer<ControlMessage>) {
        self.receiver = Some(receiver);
    }

    /// The current configuration.
    pub fn patch(&self) -> &Patch {
        &self.patch
    }

    /// Mutable access to the configuration. Safe to expose because every
    /// sub-config clamps in its setters; intended for same-thread edits
    /// between blocks (cross-thread edits go through the message channel).
    pub fn patch_mut(&mut self) -> &mut Patch {
        &mut self.patch
    }

    /// Sample rate the engine renders at.
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Change the sample rate; per-voice coefficients refresh at the next
    /// control tick.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate.max(1.0);
        self.lfo.set_sample_rate(self.sample_rate);
    }

    /// Set the global pitch-bend offset in semitones, clamped to ±24.
    pub fn set_pitch_bend(&mut self, semitones: f32) {
        self.bend_semitones = semitones.clamp(-24.0, 24.0);
        self.bend_ratio = exp2f(self.bend_semitones / 12.0);
    }

    /// Current pitch-bend offset in semitones.
    pub fn pitch_bend(&self) -> f32 {
        self.bend_semitones
    }

    /// Start a note. Returns the voice index used, or `None` only for the
    /// degenerate zero-voice pool; with any voices at all, allocation
    /// always succeeds (stealing the least perceptible voice if needed).
    pub fn note_on(&mut self, note: u8, velocity: u8) -> Option<usize> {
        let note = note.min(127);
        let idx = self.choose_voice(note)?;

        // A stolen voice's old note must not keep pointing at this slot.
        let old_note = self.voices[idx].note();
        if self.note_to_voice[old_note as usize] == Some(idx as u8) {
            self.note_to_voice[old_note as usize] = None;
        }
        self.note_to_voice[note as usize] = Some(idx as u8);

        #[cfg(feature = "tracing")]
        tracing::debug!(note, velocity, voice = idx, "note_on");

        self.voices[idx].start(&self.patch, note, velocity.min(127));
        Some(idx)
    }

    /// Release a note. A note that is not currently assigned to any voice
    /// is a silent no-op returning `None`; the loop never indexes with
    /// that sentinel.
    pub fn note_off(&mut self, note: u8) -> Option<usize> {
        let note = note.min(127) as usize;
        let idx = usize::from(self.note_to_voice[note]?);
        self.note_to_voice[note] = None;

        #[cfg(feature = "tracing")]
        tracing::debug!(note, voice = idx, "note_off");

        self.voices[idx].release(&self.patch);
        Some(idx)
    }

    /// Release every sounding voice and clear the note map.
    pub fn all_notes_off(&mut self) {
        for voice in &mut self.voices {
            if voice.is_active() {
                voice.release(&self.patch);
            }
        }
        self.note_to_voice = [None; 128];
    }

    /// Number of voices currently producing output.
    pub fn active_voice_count(&self) -> usize {
        self.voices.iter().filter(|v| v.is_active()).count()
    }

    /// Read-only snapshot of one voice for display; `None` past the pool.
    pub fn voice_snapshot(&self, index: usize) -> Option<VoiceSnapshot> {
        let v = self.voices.get(index)?;
        Some(VoiceSnapshot {
            note: v.note(),
            velocity: v.velocity(),
            stage: v.amp_stage(),
            level: v.amp_level(),
            cutoff_hz: v.cutoff_hz(),
        })
    }

    /// Most recent control-rate LFO value, for display.
    pub fn lfo_value(&self) -> f32 {
        self.lfo_value
    }

    /// Fill a caller-provided interleaved stereo buffer.
    ///
    /// Completes synthesis for every frame before returning; allocates
    /// nothing and never blocks. Pending control messages are drained at
    /// the block boundary, then the active-voice list is rebuilt and the
    /// block rendered in control-rate sub-blocks.
    pub fn render(&mut self, out: &mut [f32]) {
        #[cfg(feature = "rtrb")]
        self.drain_messages();
        self.rebuild_active();

        let frames = out.len() / 2;
        let dt = 1.0 / self.sample_rate;
        let mut frame = 0;

        while frame < frames {
            let run = CONTROL_INTERVAL.min(frames - frame);
            self.control_tick(run as u32);

            for _ in 0..run {
                let mut sum = 0.0;
                let patch = &self.patch;
                let mut vi = 0;
                while vi < self.active_len {
                    let voice = &mut self.voices[usize::from(self.active[vi])];
                    sum += voice.render_sample(patch, dt);
                    if voice.is_active() {
                        vi += 1;
                    } else {
                        // Finished mid-block: swap-with-last, stay at vi.
                        self.active_len -= 1;
                        self.active[vi] = self.active[self.active_len];
                    }
                }
                let sample = sum * self.patch.amp.master_gain();
                out[2 * frame] = sample;
                out[2 * frame + 1] = sample;
                frame += 1;
            }
        }
    }

    /// Voice selection: a slot already sounding the same note wins
    /// (retrigger, even mid-release), then any slot whose envelope is Off,
    /// then the quietest sounding slot: smallest current envelope
    /// amplitude, regardless of age or pitch.
    fn choose_voice(&self, note: u8) -> Option<usize> {
        if VOICES == 0 {
            return None;
        }
        if let Some(idx) = self
            .voices
            .iter()
            .position(|v| v.is_active() && v.note() == note)
        {
            return Some(idx);
        }
        if let Some(idx) = self.voices.iter().position(|v| !v.is_active()) {
            return Some(idx);
        }
        let idx = self
            .voices
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| a.amp_level().total_cmp(&b.amp_level()))
            .map(|(i, _)| i)?;

        #[cfg(feature = "tracing")]
        tracing::debug!(stolen = idx, "voice steal");

        Some(idx)
    }

    fn rebuild_active(&mut self) {
        self.active_len = 0;
        for (i, voice) in self.voices.iter().enumerate() {
            if voice.is_active() {
                self.active[self.active_len] = i as u8;
                self.active_len += 1;
            }
        }
    }

    /// Control-rate tick covering `run` samples: the LFO advances even
    /// when nothing sounds, so modulation never stalls across silence.
    fn control_tick(&mut self, run: u32) {
        self.lfo.set_frequency(self.patch.lfo.rate_hz());
        self.lfo.set_waveform(self.patch.lfo.waveform());
        self.lfo_value = self.lfo.tick(run);

        let patch = &self.patch;
        for vi in 0..self.active_len {
            self.voices[usize::from(self.active[vi])].update_control(
                patch,
                self.sample_rate,
                self.bend_ratio,
                self.lfo_value,
            );
        }
    }

    #[cfg(feature = "rtrb")]
    fn drain_messages(&mut self) {
        loop {
            let msg = match self.receiver.as_mut() {
                Some(rx) => rx.pop().ok(),
                None => None,
            };
            let Some(msg) = msg else { break };
            self.apply_message(msg);
        }
    }

    #[cfg(feature = "rtrb")]
    fn apply_message(&mut self, msg: ControlMessage) {
        #[cfg(feature = "tracing")]
        tracing::trace!(?msg, "control message");

        match msg {
            ControlMessage::NoteOn { note, velocity } => {
                self.note_on(note, velocity);
            }
            ControlMessage::NoteOff { note, .. } => {
                self.note_off(note);
            }
            ControlMessage::PitchBend { semitones } => self.set_pitch_bend(semitones),
            ControlMessage::AllNotesOff => self.all_notes_off(),
            ControlMessage::SetWaveform { slot, waveform } => {
                if let Some(cfg) = self.patch.osc.get_mut(slot as usize) {
                    cfg.set_waveform(waveform);
                }
            }
            ControlMessage::SetOscShape { slot, shape } => {
                if let Some(cfg) = self.patch.osc.get_mut(slot as usize) {
                    cfg.set_shape(shape);
                }
            }
            ControlMessage::SetFilterCutoff { hz } => self.patch.filter.set_cutoff_hz(hz),
            ControlMessage::SetFilterResonance { amount } => {
                self.patch.filter.set_resonance(amount);
            }
            ControlMessage::SetFilterMode { mode } => self.patch.filter.set_mode(mode),
            ControlMessage::SetLfoRate { hz } => self.patch.lfo.set_rate_hz(hz),
            ControlMessage::SetMasterGain { gain } => self.patch.amp.set_master_gain(gain),
        }
    }
}
