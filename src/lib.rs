pub mod config;
pub mod dsp;
pub mod error;
pub mod graph; // Renderer contract and the software node graph
pub mod synth; // Voices, envelopes, filter chain and the engine facade

pub use config::SynthConfig;
pub use error::{RenderError, Result, SynthError};
pub use graph::renderer::AudioRenderer;
pub use graph::software::SoftwareRenderer;
pub use synth::engine::SynthEngine;

pub const MAX_BLOCK_SIZE: usize = 2048;
