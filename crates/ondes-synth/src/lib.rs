//! Ondes Synth - a real-time polyphonic subtractive synthesis engine
//!
//! This crate implements the signal-generation and voice-management core of
//! an analog-style synthesizer: band-limited oscillators, ADSR envelopes, a
//! pole-mixing ladder filter, a fixed voice pool with least-perceptible
//! stealing, and the block-rendering audio loop that ties them together
//! under a hard real-time deadline.
//!
//! # Core Components
//!
//! ## Oscillators
//!
//! Band-limited kernels with PolyBLEP/PolyBLAMP antialiasing, hard sync,
//! shift-register "poly" wavetables and colored noise:
//!
//! ```rust
//! use ondes_synth::{OscillatorConfig, OscillatorState, Waveform};
//!
//! let mut cfg = OscillatorConfig::default();
//! cfg.set_waveform(Waveform::Saw);
//! let mut state = OscillatorState::new();
//!
//! let sample = state.advance(&cfg, 440.0 / 48000.0);
//! ```
//!
//! ## Envelopes
//!
//! Exponential-approach ADSR with bias-corrected targets, so every stage
//! lands on its endpoint within the configured time:
//!
//! ```rust
//! use ondes_synth::{AdsrEnvelope, EnvelopeConfig};
//!
//! let mut cfg = EnvelopeConfig::default();
//! cfg.set_attack(0.01);
//! cfg.set_release(0.2);
//!
//! let mut env = AdsrEnvelope::new();
//! env.gate(&cfg, true);
//! let level = env.advance(&cfg, 1.0 / 48000.0);
//! ```
//!
//! ## Filter
//!
//! A four-stage ladder with nineteen pole-mixing responses, oversampled for
//! stability and soft-saturated in the feedback path.
//!
//! ## Engine
//!
//! [`SynthEngine`] owns the whole configuration ([`Patch`]), the voice
//! pool, the note map and the shared LFO, and renders interleaved stereo
//! blocks:
//!
//! ```rust
//! use ondes_synth::{SynthEngine, Waveform};
//!
//! let mut synth: SynthEngine<8> = SynthEngine::new(48000.0);
//! synth.patch_mut().osc[0].set_waveform(Waveform::Saw);
//! synth.patch_mut().filter.set_cutoff_hz(2000.0);
//!
//! synth.note_on(60, 100);
//! synth.note_on(64, 100);
//!
//! let mut buffer = vec![0.0f32; 2 * 512]; // interleaved stereo
//! synth.render(&mut buffer);
//! ```
//!
//! # Threading
//!
//! The render path never blocks, locks or allocates. Cross-thread control
//! goes through a lock-free SPSC message channel (the `rtrb` feature,
//! enabled by default) drained at block boundaries; see
//! [`control_channel`](message::control_channel).
//!
//! # no_std Support
//!
//! With default features disabled the crate is `no_std` compatible (the
//! message channel requires `std`):
//!
//! ```toml
//! [dependencies]
//! ondes-synth = { version = "0.1", default-features = false }
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

pub mod engine;
pub mod envelope;
pub mod filter;
pub mod message;
pub mod oscillator;
pub mod voice;
pub mod wavetable;

// Re-export main types at crate root
pub use engine::{
    AmplifierConfig, CONTROL_INTERVAL, DEFAULT_VOICES, LfoConfig, Patch, SubOscConfig, SubOscMode,
    SynthEngine, VoiceSnapshot,
};
pub use envelope::{AdsrEnvelope, EnvelopeConfig, EnvelopeStage, MIN_TIME};
pub use filter::{FilterConfig, FilterMode, LadderFilter};
pub use message::ControlMessage;
#[cfg(feature = "rtrb")]
pub use message::control_channel;
pub use oscillator::{OscillatorConfig, OscillatorState, Waveform};
pub use voice::{OSCS_PER_VOICE, Voice, midi_to_freq, velocity_gain};

// Re-export commonly used types from ondes-core
pub use ondes_core::{Lfo, LfoWaveform, db_to_linear, linear_to_db};
