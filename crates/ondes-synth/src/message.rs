//! Control messages for the cross-thread parameter path.
//!
//! UI and input threads never touch the engine directly: they push
//! [`ControlMessage`]s into a single-producer/single-consumer ring buffer
//! and the audio thread drains it at block boundaries. The audio callback
//! therefore never blocks or takes a lock, and a parameter edit can never
//! tear a multi-field config mid-block.

use crate::filter::FilterMode;
use crate::oscillator::Waveform;

/// A control-path event, applied by the engine at the next block boundary.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum ControlMessage {
    /// Start a note (MIDI note number, velocity 0–127).
    NoteOn {
        /// MIDI note number, 0–127.
        note: u8,
        /// MIDI velocity, 0–127.
        velocity: u8,
    },
    /// Release a note. Unassigned notes are absorbed silently.
    NoteOff {
        /// MIDI note number, 0–127.
        note: u8,
        /// MIDI release velocity (currently unused by the engine).
        velocity: u8,
    },
    /// Set the global pitch-bend offset in semitones.
    PitchBend {
        /// Bend amount in semitones, clamped by the engine.
        semitones: f32,
    },
    /// Release every sounding voice.
    AllNotesOff,
    /// Switch an oscillator slot's waveform.
    SetWaveform {
        /// Oscillator slot index.
        slot: u8,
        /// New waveform family.
        waveform: Waveform,
    },
    /// Set an oscillator slot's shape parameter.
    SetOscShape {
        /// Oscillator slot index.
        slot: u8,
        /// Shape in [0, 1] (clamped by the config).
        shape: f32,
    },
    /// Set the filter's base cutoff in Hz.
    SetFilterCutoff {
        /// Cutoff in Hz (clamped by the config).
        hz: f32,
    },
    /// Set the filter resonance in [0, 1].
    SetFilterResonance {
        /// Resonance amount (clamped by the config).
        amount: f32,
    },
    /// Select the filter response mode.
    SetFilterMode {
        /// New mode.
        mode: FilterMode,
    },
    /// Set the shared LFO rate in Hz.
    SetLfoRate {
        /// Rate in Hz (clamped by the config).
        hz: f32,
    },
    /// Set the master output gain.
    SetMasterGain {
        /// Linear gain (clamped by the config).
        gain: f32,
    },
}

/// Create the control channel: the producer side goes to the input/UI
/// thread, the consumer side is handed to the engine with
/// [`SynthEngine::attach_receiver`](crate::engine::SynthEngine::attach_receiver).
#[cfg(feature = "rtrb")]
pub fn control_channel(
    capacity: usize,
) -> (rtrb::Producer<ControlMessage>, rtrb::Consumer<ControlMessage>) {
    rtrb::RingBuffer::new(capacity)
}
