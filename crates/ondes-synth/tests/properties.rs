//! Property-based tests for the synthesis primitives.
//!
//! Tests filter stability, envelope state-machine invariants and oscillator
//! boundedness using proptest for randomized input generation.

use proptest::prelude::*;
use ondes_synth::{
    AdsrEnvelope, EnvelopeConfig, EnvelopeStage, FilterMode, LadderFilter, OscillatorConfig,
    OscillatorState, Waveform,
};

const SR: f32 = 48000.0;
const DT: f32 = 1.0 / SR;

fn waveform(idx: usize) -> Waveform {
    match idx % 8 {
        0 => Waveform::Sine,
        1 => Waveform::Saw,
        2 => Waveform::Pulse,
        3 => Waveform::Triangle,
        4 => Waveform::Poly4,
        5 => Waveform::Poly5,
        6 => Waveform::Poly9,
        _ => Waveform::Noise,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// For any valid cutoff, resonance and mode, the ladder produces finite
    /// output for random bounded input.
    #[test]
    fn ladder_stability(
        cutoff in 20.0f32..20000.0f32,
        resonance in 0.0f32..=1.0f32,
        mode_idx in 0usize..19,
        input in prop::array::uniform32(-1.0f32..=1.0f32),
    ) {
        let mut filter = LadderFilter::new();
        filter.setup(cutoff, resonance, SR);
        let row = FilterMode::ALL[mode_idx].mix_row();

        for &sample in &input {
            let out = filter.process(sample, row);
            prop_assert!(
                out.is_finite(),
                "{:?} (cutoff={}, res={}) produced non-finite output {} for input {}",
                FilterMode::ALL[mode_idx], cutoff, resonance, out, sample
            );
        }
    }

    /// Zero resonance never self-oscillates: silence in, silence out,
    /// whatever the coefficients.
    #[test]
    fn ladder_zero_input_zero_output(
        cutoff in 20.0f32..20000.0f32,
        mode_idx in 0usize..19,
    ) {
        let mut filter = LadderFilter::new();
        filter.setup(cutoff, 0.0, SR);
        let row = FilterMode::ALL[mode_idx].mix_row();

        for _ in 0..256 {
            let out = filter.process(0.0, row);
            prop_assert!(out.abs() < 1e-6, "silence produced {out}");
        }
    }

    /// Under any random gate sequence the envelope level stays in [0, 1]
    /// and the Off stage always coincides with an exactly-zero level.
    #[test]
    fn envelope_invariants_under_random_gates(
        attack in 0.0f32..0.05f32,
        decay in 0.0f32..0.05f32,
        sustain in 0.0f32..=1.0f32,
        release in 0.0f32..0.05f32,
        gates in prop::collection::vec((any::<bool>(), 1usize..400), 1..20),
    ) {
        let mut cfg = EnvelopeConfig::default();
        cfg.set_attack(attack);
        cfg.set_decay(decay);
        cfg.set_sustain(sustain);
        cfg.set_release(release);

        let mut env = AdsrEnvelope::new();
        for (gate_on, samples) in gates {
            env.gate(&cfg, gate_on);
            for _ in 0..samples {
                let level = env.advance(&cfg, DT);
                prop_assert!((0.0..=1.0).contains(&level), "level escaped: {level}");
                if env.stage() == EnvelopeStage::Off {
                    prop_assert!(level == 0.0, "Off stage with nonzero level {level}");
                }
            }
        }
    }

    /// Every waveform family stays bounded and finite across the audible
    /// range, shape values and sync settings.
    #[test]
    fn oscillator_bounded_everywhere(
        wf_idx in 0usize..8,
        freq in 20.0f32..10000.0f32,
        shape in 0.0f32..=1.0f32,
        sync_phase in 0.05f32..=1.0f32,
        sync in any::<bool>(),
    ) {
        let mut cfg = OscillatorConfig::default();
        cfg.set_waveform(waveform(wf_idx));
        cfg.set_shape(shape);
        cfg.set_sync(sync, sync_phase);

        let mut state = OscillatorState::new();
        let step = freq / SR;
        for _ in 0..2048 {
            let s = state.advance(&cfg, step);
            prop_assert!(s.is_finite(), "{:?} non-finite", waveform(wf_idx));
            prop_assert!(
                s.abs() <= 1.5,
                "{:?} escaped bounds at freq {}: {}",
                waveform(wf_idx), freq, s
            );
        }
    }

    /// The wavetable index never leaves [0, loop_cycle) no matter how the
    /// oscillator is driven.
    #[test]
    fn table_index_in_range(
        wf_idx in 4usize..7,
        freq in 20.0f32..20000.0f32,
    ) {
        let mut cfg = OscillatorConfig::default();
        cfg.set_waveform(waveform(wf_idx));
        let mut state = OscillatorState::new();
        for _ in 0..4096 {
            state.advance(&cfg, freq / SR);
            prop_assert!(state.index() < cfg.loop_cycle());
        }
    }
}
