//! ADSR envelope generator.
//!
//! Five-stage state machine (Off/Attack/Decay/Sustain/Release) driven by
//! exponential approach toward *bias-corrected* targets: each stage aims
//! slightly past its nominal endpoint so a fixed-time exponential actually
//! lands on the endpoint within the configured stage time instead of
//! approaching it asymptotically forever. The attack is calibrated to one
//! time constant, decay and release to three.
//!
//! Gate changes are idempotent (repeating the current gate state is a
//! no-op), and a release started during decay uses whichever of the two
//! rates is slower, so the level never jumps audibly at the handover.

/// Envelope stage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EnvelopeStage {
    /// Inactive; output is exactly zero and the voice is reclaimable.
    #[default]
    Off,
    /// Rising toward the peak after gate-on.
    Attack,
    /// Falling from the peak toward the sustain level.
    Decay,
    /// Holding the sustain level while the gate stays on.
    Sustain,
    /// Falling toward zero after gate-off.
    Release,
}

/// Shortest representable stage time in seconds.
///
/// Stage times are clamped here before the reciprocal is taken, so a
/// zero-length stage can never divide by zero.
pub const MIN_TIME: f32 = 1e-4;

// Bias constants. Attack aims at 1/(1 - e^-1) so one time constant of
// exponential approach lands exactly on 1.0; decay and release aim past
// their endpoints by e^-3/(1 - e^-3), landing after three.
const ATTACK_TARGET: f32 = 1.5819767;
const OVERSHOOT: f32 = 0.052395;

/// Envelope timing parameters, stored as precomputed rates.
///
/// Times are converted to reciprocal rates at the setter (`1/max(t, ε)` for
/// attack, `3/max(t, ε)` for decay and release, the factor matching the
/// bias calibration above), so the per-sample update is a single
/// multiply-add with no division.
#[derive(Clone, Copy, Debug)]
pub struct EnvelopeConfig {
    enabled: bool,
    attack_s: f32,
    decay_s: f32,
    release_s: f32,
    attack_rate: f32,
    decay_rate: f32,
    release_rate: f32,
    sustain: f32,
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        let mut cfg = Self {
            enabled: true,
            attack_s: 0.0,
            decay_s: 0.0,
            release_s: 0.0,
            attack_rate: 0.0,
            decay_rate: 0.0,
            release_rate: 0.0,
            sustain: 0.8,
        };
        cfg.set_attack(0.005);
        cfg.set_decay(0.1);
        cfg.set_release(0.2);
        cfg
    }
}

impl EnvelopeConfig {
    /// Enable or bypass the envelope. A bypassed envelope maps the gate
    /// directly to full-on/full-off with no transition.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Whether the envelope shapes the signal.
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Set attack time in seconds (clamped to [`MIN_TIME`]).
    pub fn set_attack(&mut self, seconds: f32) {
        self.attack_s = seconds.max(MIN_TIME);
        self.attack_rate = 1.0 / self.attack_s;
    }

    /// Attack time actually used (clamped).
    pub fn attack(&self) -> f32 {
        self.attack_s
    }

    /// Set decay time in seconds (clamped to [`MIN_TIME`]).
    pub fn set_decay(&mut self, seconds: f32) {
        self.decay_s = seconds.max(MIN_TIME);
        self.decay_rate = 3.0 / self.decay_s;
    }

    /// Decay time actually used (clamped).
    pub fn decay(&self) -> f32 {
        self.decay_s
    }

    /// Set release time in seconds (clamped to [`MIN_TIME`]).
    pub fn set_release(&mut self, seconds: f32) {
        self.release_s = seconds.max(MIN_TIME);
        self.release_rate = 3.0 / self.release_s;
    }

    /// Release time actually used (clamped).
    pub fn release(&self) -> f32 {
        self.release_s
    }

    /// Set sustain level, clamped to [0, 1].
    pub fn set_sustain(&mut self, level: f32) {
        self.sustain = level.clamp(0.0, 1.0);
    }

    /// Sustain level actually used (clamped).
    pub fn sustain(&self) -> f32 {
        self.sustain
    }
}

/// Per-voice envelope state.
///
/// Invariant: `stage == Off` implies `level == 0`. The level may pass
/// through zero in other stages only at the exact boundary crossing.
#[derive(Clone, Copy, Debug, Default)]
pub struct AdsrEnvelope {
    stage: EnvelopeStage,
    level: f32,
    gate: bool,
    // Captured at stage transitions
    decay_target: f32,
    release_target: f32,
    release_rate: f32,
}

impl AdsrEnvelope {
    /// Fresh envelope in the Off stage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current stage.
    pub fn stage(&self) -> EnvelopeStage {
        self.stage
    }

    /// Current amplitude in [0, 1].
    pub fn level(&self) -> f32 {
        self.level
    }

    /// Whether the envelope is producing output (not Off).
    pub fn is_active(&self) -> bool {
        self.stage != EnvelopeStage::Off
    }

    /// Force the envelope to the Off stage with zero level.
    pub fn reset(&mut self) {
        self.stage = EnvelopeStage::Off;
        self.level = 0.0;
        self.gate = false;
    }

    /// Change the gate state. Idempotent: repeating the current gate state
    /// does nothing. Gate-on forces Attack, gate-off forces Release; with
    /// the envelope bypassed the gate maps straight to full-on/full-off.
    pub fn gate(&mut self, cfg: &EnvelopeConfig, on: bool) {
        if on == self.gate {
            return;
        }
        self.gate = on;

        if !cfg.enabled() {
            if on {
                self.stage = EnvelopeStage::Sustain;
                self.level = 1.0;
            } else {
                self.stage = EnvelopeStage::Off;
                self.level = 0.0;
            }
            return;
        }

        if on {
            self.stage = EnvelopeStage::Attack;
        } else {
            self.stage = EnvelopeStage::Release;
            // The slower of the two falling rates, so releasing mid-decay
            // cannot speed the level up.
            self.release_rate = cfg.release_rate.min(cfg.decay_rate);
            self.release_target = -self.level * OVERSHOOT;
        }
    }

    /// Advance the envelope by `dt` seconds and return the new level.
    #[inline]
    pub fn advance(&mut self, cfg: &EnvelopeConfig, dt: f32) -> f32 {
        match self.stage {
            EnvelopeStage::Off => {
                self.level = 0.0;
            }

            EnvelopeStage::Attack => {
                self.level += (ATTACK_TARGET - self.level) * cfg.attack_rate * dt;
                if self.level >= 1.0 {
                    self.level = 1.0;
                    self.decay_target = cfg.sustain() - (1.0 - cfg.sustain()) * OVERSHOOT;
                    self.stage = EnvelopeStage::Decay;
                }
            }

            EnvelopeStage::Decay => {
                self.level += (self.decay_target - self.level) * cfg.decay_rate * dt;
                if self.level <= cfg.sustain() {
                    self.level = cfg.sustain();
                    self.stage = EnvelopeStage::Sustain;
                }
            }

            EnvelopeStage::Sustain => {
                self.level = cfg.sustain();
            }

            EnvelopeStage::Release => {
                self.level += (self.release_target - self.level) * self.release_rate * dt;
                if self.level <= 0.0 {
                    self.level = 0.0;
                    self.stage = EnvelopeStage::Off;
                }
            }
        }
        self.level
    }
}
