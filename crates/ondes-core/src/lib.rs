//! Ondes Core - DSP primitives for the ondes synthesis engine
//!
//! This crate provides the foundational building blocks shared by the
//! synthesis engine, designed for real-time audio processing with zero
//! allocation in the audio path.
//!
//! # Components
//!
//! - [`Lfo`] - Low-frequency oscillator with control-rate advancement
//! - [`OnePole`] - One-pole lowpass for tone shaping and noise coloring
//! - Fast math: [`fast_tanh`], [`fast_exp2`]
//! - Utilities: [`db_to_linear`], [`linear_to_db`], [`flush_denormal`], [`lerp`]
//!
//! # no_std Support
//!
//! This crate is `no_std` compatible. Disable the default `std` feature:
//!
//! ```toml
//! [dependencies]
//! ondes-core = { version = "0.1", default-features = false }
//! ```
//!
//! # Design Principles
//!
//! - **Real-time safe**: No allocations in audio processing paths
//! - **No dependencies on std**: Pure `no_std` with `libm` for math
//! - **Explicit state**: every primitive owns its state; nothing ambient

#![cfg_attr(not(feature = "std"), no_std)]

pub mod fast_math;
pub mod lfo;
pub mod math;
pub mod one_pole;

pub use fast_math::{fast_exp2, fast_tanh};
pub use lfo::{Lfo, LfoWaveform};
pub use math::{db_to_linear, flush_denormal, lerp, linear_to_db};
pub use one_pole::OnePole;
