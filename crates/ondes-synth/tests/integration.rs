//! Integration tests for ondes-synth.
//!
//! End-to-end scenarios through the engine's block renderer: note
//! lifecycle, release behavior, voice independence, antialiasing quality
//! and display snapshots.

use ondes_synth::{
    CONTROL_INTERVAL, EnvelopeStage, FilterMode, SynthEngine, Waveform, linear_to_db, midi_to_freq,
};

const SR: f32 = 48000.0;

fn render_frames<const V: usize>(engine: &mut SynthEngine<V>, frames: usize) -> Vec<f32> {
    let mut out = vec![0.0f32; frames * 2];
    engine.render(&mut out);
    out
}

/// Mono samples (left channel) from an interleaved stereo buffer.
fn left(samples: &[f32]) -> Vec<f32> {
    samples.iter().step_by(2).copied().collect()
}

fn rms(samples: &[f32]) -> f32 {
    (samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32).sqrt()
}

/// DFT magnitude in dB at one frequency bin via Goertzel's algorithm:
/// O(N) for a single bin, no FFT dependency needed.
fn goertzel_magnitude_db(signal: &[f32], bin: usize, n: usize) -> f32 {
    use std::f64::consts::PI;
    let w = 2.0 * PI * bin as f64 / n as f64;
    let coeff = 2.0 * w.cos();
    let mut s0: f64 = 0.0;
    let mut s1: f64 = 0.0;
    let mut s2: f64;
    for &x in signal.iter().take(n) {
        s2 = s1;
        s1 = s0;
        s0 = f64::from(x) + coeff * s1 - s2;
    }
    let real = s0 - s1 * w.cos();
    let imag = s1 * w.sin();
    let magnitude = (real * real + imag * imag).sqrt() / (n as f64 / 2.0);
    linear_to_db(magnitude as f32)
}

// ---------------------------------------------------------------------------
// 1. Note lifecycle end-to-end
// ---------------------------------------------------------------------------

#[test]
fn release_decays_monotonically_to_silence() {
    // NoteOn, hold 50 ms, NoteOff with a 200 ms release: the RMS envelope
    // must fall monotonically from the release point and be near zero by
    // the nominal release time.
    let mut engine: SynthEngine<4> = SynthEngine::new(SR);
    engine.patch_mut().amp_env.set_attack(0.005);
    engine.patch_mut().amp_env.set_release(0.2);
    engine.patch_mut().filter.set_enabled(false);

    engine.note_on(60, 100);
    render_frames(&mut engine, (0.05 * SR) as usize);
    engine.note_off(60);

    // Measure RMS in 10 ms windows across the release tail
    let window = (0.01 * SR) as usize;
    let mut levels = Vec::new();
    for _ in 0..20 {
        let chunk = left(&render_frames(&mut engine, window));
        levels.push(rms(&chunk));
    }

    for pair in levels.windows(2) {
        assert!(
            pair[1] <= pair[0] * 1.05,
            "release RMS must not grow: {:?}",
            levels
        );
    }
    let last = *levels.last().unwrap();
    let first = levels[0];
    assert!(
        last < first * 0.05,
        "release should be near-silent after 200 ms: first={first}, last={last}"
    );
}

#[test]
fn overlapping_notes_are_independent() {
    let mut engine: SynthEngine<4> = SynthEngine::new(SR);
    engine.patch_mut().amp_env.set_release(0.01);

    let a = engine.note_on(60, 100).unwrap();
    let b = engine.note_on(67, 100).unwrap();
    assert_ne!(a, b, "overlapping notes must occupy distinct voices");

    render_frames(&mut engine, 2048);
    engine.note_off(60);
    render_frames(&mut engine, 4096);

    let snap_a = engine.voice_snapshot(a).unwrap();
    let snap_b = engine.voice_snapshot(b).unwrap();
    assert_eq!(snap_a.stage, EnvelopeStage::Off);
    assert_ne!(snap_b.stage, EnvelopeStage::Off);
    assert_eq!(snap_b.note, 67);
}

#[test]
fn snapshots_report_live_voice_state() {
    let mut engine: SynthEngine<4> = SynthEngine::new(SR);
    engine.note_on(72, 90);
    render_frames(&mut engine, 1024);

    let snap = engine.voice_snapshot(0).unwrap();
    assert_eq!(snap.note, 72);
    assert_eq!(snap.velocity, 90);
    assert!(snap.level > 0.0);
    assert!(snap.cutoff_hz > 0.0);
    assert!(engine.voice_snapshot(99).is_none());
}

// ---------------------------------------------------------------------------
// 2. Pitch accuracy through the whole engine
// ---------------------------------------------------------------------------

#[test]
fn rendered_pitch_matches_midi_note() {
    let mut engine: SynthEngine<1> = SynthEngine::new(SR);
    engine.patch_mut().osc[0].set_waveform(Waveform::Sine);
    engine.patch_mut().filter.set_enabled(false);
    engine.patch_mut().amp_env.set_attack(0.001);

    engine.note_on(69, 100); // A4 = 440 Hz
    render_frames(&mut engine, 4096); // past the attack
    let samples = left(&render_frames(&mut engine, SR as usize));

    let mut zero_crossings = 0;
    for pair in samples.windows(2) {
        if pair[0] <= 0.0 && pair[1] > 0.0 {
            zero_crossings += 1;
        }
    }
    assert!(
        (zero_crossings - 440i32).abs() <= 3,
        "expected ~440 cycles in one second, got {zero_crossings}"
    );
}

#[test]
fn pitch_bend_shifts_frequency() {
    let mut engine: SynthEngine<1> = SynthEngine::new(SR);
    engine.patch_mut().osc[0].set_waveform(Waveform::Sine);
    engine.patch_mut().filter.set_enabled(false);

    engine.note_on(69, 100);
    engine.set_pitch_bend(12.0); // one octave up
    render_frames(&mut engine, 4096);
    let samples = left(&render_frames(&mut engine, SR as usize));

    let mut zero_crossings = 0;
    for pair in samples.windows(2) {
        if pair[0] <= 0.0 && pair[1] > 0.0 {
            zero_crossings += 1;
        }
    }
    assert!(
        (zero_crossings - 880i32).abs() <= 5,
        "bent A4 should render at ~880 Hz, got {zero_crossings}"
    );
}

// ---------------------------------------------------------------------------
// 3. Antialiasing quality
// ---------------------------------------------------------------------------

/// A 5 kHz saw at 48 kHz folds its 10th harmonic (50 kHz) down to 2 kHz,
/// the 11th (55 kHz) to 7 kHz. With band-limited synthesis those alias
/// products must sit well below the fundamental.
#[test]
fn saw_alias_products_are_suppressed() {
    let mut engine: SynthEngine<1> = SynthEngine::new(SR);
    engine.patch_mut().osc[0].set_waveform(Waveform::Saw);
    engine.patch_mut().filter.set_enabled(false);
    engine.patch_mut().amp_env.set_attack(0.001);
    engine.patch_mut().amp.set_master_gain(1.0);
    engine.patch_mut().amp.set_base(1.0);
    engine.patch_mut().amp.set_velocity_sensitivity(0.0);

    // 5 kHz is not a MIDI pitch; pick the note and ratio so the rendered
    // frequency lands exactly on an integer bin for a 1-second window.
    let note = 96; // C7 ≈ 2093 Hz
    let ratio = 5000.0 / midi_to_freq(note);
    engine.patch_mut().osc[0].set_frequency_ratio(ratio);

    engine.note_on(note, 100);
    render_frames(&mut engine, 8192); // settle past attack and decay
    let n = SR as usize;
    let samples = left(&render_frames(&mut engine, n));

    let fundamental_db = goertzel_magnitude_db(&samples, 5000, n);
    for alias_bin in [2000usize, 7000, 12000] {
        let alias_db = goertzel_magnitude_db(&samples, alias_bin, n);
        let suppression = fundamental_db - alias_db;
        assert!(
            suppression > 40.0,
            "alias at {alias_bin} Hz only {suppression:.1} dB below fundamental"
        );
    }
}

// ---------------------------------------------------------------------------
// 4. Filter in the full path
// ---------------------------------------------------------------------------

#[test]
fn lowpass_darkens_a_saw() {
    let render_with_cutoff = |cutoff: f32| -> f32 {
        let mut engine: SynthEngine<1> = SynthEngine::new(SR);
        engine.patch_mut().osc[0].set_waveform(Waveform::Saw);
        engine.patch_mut().filter.set_mode(FilterMode::Lp4);
        engine.patch_mut().filter.set_cutoff_hz(cutoff);
        engine.patch_mut().filter.set_env_octaves(0.0);
        engine.note_on(45, 100); // A2, rich in harmonics
        render_frames(&mut engine, 8192);
        let n = 16384;
        let samples = left(&render_frames(&mut engine, n));
        // Energy in a high harmonic (20th at 2.2 kHz)
        goertzel_magnitude_db(&samples, (midi_to_freq(45) * 20.0) as usize * n / SR as usize, n)
    };

    let bright = render_with_cutoff(16000.0);
    let dark = render_with_cutoff(300.0);
    assert!(
        bright - dark > 12.0,
        "closing the filter should darken the sound: bright={bright:.1} dB, dark={dark:.1} dB"
    );
}

#[test]
fn filter_envelope_opens_cutoff_over_time() {
    let mut engine: SynthEngine<1> = SynthEngine::new(SR);
    engine.patch_mut().filter.set_cutoff_hz(200.0);
    engine.patch_mut().filter.set_env_octaves(4.0);
    engine.patch_mut().filter_env.set_attack(0.2);

    engine.note_on(60, 100);
    render_frames(&mut engine, CONTROL_INTERVAL * 4);
    let early = engine.voice_snapshot(0).unwrap().cutoff_hz;

    render_frames(&mut engine, (0.2 * SR) as usize);
    let late = engine.voice_snapshot(0).unwrap().cutoff_hz;

    assert!(
        late > early * 2.0,
        "filter envelope should sweep the cutoff up: {early} -> {late}"
    );
}

// ---------------------------------------------------------------------------
// 5. Polyphony under load
// ---------------------------------------------------------------------------

#[test]
fn full_pool_remains_finite_and_bounded() {
    let mut engine: SynthEngine<16> = SynthEngine::new(SR);
    engine.patch_mut().osc[1].set_amplitude(0.5);
    engine.patch_mut().osc[1].set_waveform(Waveform::Pulse);
    engine.patch_mut().sub.set_level(0.3);
    engine.patch_mut().filter.set_resonance(0.9);

    for i in 0..24 {
        engine.note_on(40 + i * 2, 100); // forces stealing past 16
    }
    let out = render_frames(&mut engine, 8192);
    for &s in &out {
        assert!(s.is_finite(), "engine output must stay finite");
        assert!(s.abs() < 16.0, "engine output unreasonably large: {s}");
    }
    assert_eq!(engine.active_voice_count(), 16);
}
