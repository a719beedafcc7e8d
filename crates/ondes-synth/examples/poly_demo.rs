//! Polyphony demo: chords, voice stealing, and the control channel.
//!
//! Run with: cargo run -p ondes-synth --example poly_demo

use ondes_synth::{
    ControlMessage, FilterMode, SynthEngine, Waveform, control_channel, db_to_linear,
};

fn main() {
    let sample_rate = 48000.0;
    let mut synth: SynthEngine<8> = SynthEngine::new(sample_rate);
    synth.patch_mut().amp.set_master_gain(db_to_linear(-12.0));

    // A classic two-oscillator patch: saw + detuned pulse through the ladder
    synth.patch_mut().osc[0].set_waveform(Waveform::Saw);
    synth.patch_mut().osc[1].set_waveform(Waveform::Pulse);
    synth.patch_mut().osc[1].set_amplitude(0.6);
    synth.patch_mut().osc[1].set_frequency_ratio(1.007); // slight detune
    synth.patch_mut().sub.set_level(0.25);
    synth.patch_mut().filter.set_mode(FilterMode::Lp4);
    synth.patch_mut().filter.set_cutoff_hz(1200.0);
    synth.patch_mut().filter.set_resonance(0.4);
    synth.patch_mut().filter.set_env_octaves(3.0);
    synth.patch_mut().amp_env.set_attack(0.01);
    synth.patch_mut().amp_env.set_release(0.3);

    // --- A chord through the direct API ---
    println!("=== C major chord, 8 voices available ===\n");
    synth.note_on(60, 100);
    synth.note_on(64, 100);
    synth.note_on(67, 100);

    let mut buffer = vec![0.0f32; 2 * 512];
    let mut peak = 0.0f32;
    for _ in 0..20 {
        synth.render(&mut buffer);
        for &s in &buffer {
            peak = peak.max(s.abs());
        }
    }
    println!(
        "active voices: {}, peak after 20 blocks: {:.3}",
        synth.active_voice_count(),
        peak
    );

    for i in 0..synth.active_voice_count() {
        let snap = synth.voice_snapshot(i).unwrap();
        println!(
            "voice {i}: note {:>3}  stage {:?}  level {:.3}  cutoff {:.0} Hz",
            snap.note, snap.stage, snap.level, snap.cutoff_hz
        );
    }

    // --- Voice stealing ---
    println!("\n=== Forcing voice stealing (12 notes into 8 voices) ===\n");
    for i in 0..12 {
        synth.note_on(40 + i * 2, 90);
    }
    synth.render(&mut buffer);
    println!("active voices capped at: {}", synth.active_voice_count());

    // --- The control channel, as an input thread would use it ---
    println!("\n=== Control messages drained at the block boundary ===\n");
    let (mut tx, rx) = control_channel(256);
    synth.attach_receiver(rx);

    tx.push(ControlMessage::AllNotesOff).unwrap();
    tx.push(ControlMessage::SetFilterCutoff { hz: 600.0 }).unwrap();
    tx.push(ControlMessage::NoteOn {
        note: 45,
        velocity: 110,
    })
    .unwrap();

    synth.render(&mut buffer);
    println!(
        "after drain: cutoff = {} Hz, active voices sounding = {}",
        synth.patch().filter.cutoff_hz(),
        synth.active_voice_count()
    );

    // --- Release tail ---
    tx.push(ControlMessage::NoteOff {
        note: 45,
        velocity: 0,
    })
    .unwrap();
    let mut blocks = 0;
    loop {
        synth.render(&mut buffer);
        blocks += 1;
        // Wait for every release tail to fade out
        if synth.active_voice_count() == 0 || blocks > 1000 {
            break;
        }
    }
    println!("all voices silent after {blocks} more blocks");
}
