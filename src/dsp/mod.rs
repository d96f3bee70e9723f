//! Low-level DSP primitives used by the software renderer.
//!
//! These components only do signal math: no graph knowledge, no scheduling
//! policy. The renderer wraps them in nodes, and the synth core never touches
//! them directly; it talks to nodes through [`crate::graph::renderer::AudioRenderer`].

/// Set/ramp/cancel automation for gain parameters.
pub mod automation;
/// State-variable filter implementation with multiple responses.
pub mod filter;
/// Seeded or entropy-backed white noise.
pub mod noise;
/// Phase-accumulator waveshapes and the ring modulator.
pub mod oscillator;

pub use automation::ParamTimeline;
pub use filter::FilterKind;
pub use oscillator::Waveshape;
