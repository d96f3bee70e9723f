//! Error types for the synth core and its renderer.

use thiserror::Error;

/// Result type alias for synth operations.
pub type Result<T> = std::result::Result<T, SynthError>;

/// Failures reported by an [`AudioRenderer`](crate::graph::renderer::AudioRenderer)
/// when it cannot produce a node.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    /// The renderer's node pool is full.
    #[error("renderer node pool exhausted ({capacity} nodes)")]
    Exhausted { capacity: usize },

    /// Any other backend-specific refusal.
    #[error("renderer unavailable: {0}")]
    Unavailable(String),
}

/// Errors surfaced by the engine facade.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SynthError {
    /// Note number outside the configured playable range.
    #[error("note {note} outside playable range {lowest}..={highest}")]
    InvalidNote { note: u8, lowest: u8, highest: u8 },

    /// Generator layer index out of bounds.
    #[error("layer index {index} out of range (layer count {count})")]
    InvalidLayerIndex { index: usize, count: usize },

    /// Filter stage index out of bounds.
    #[error("filter stage index {index} out of range (stage count {count})")]
    InvalidStageIndex { index: usize, count: usize },

    /// Parameter value rejected before anything was written.
    #[error("invalid value {value} for parameter `{name}`")]
    InvalidParameter { name: &'static str, value: f32 },

    /// Rejected engine configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The renderer failed to produce a node; the attempt was rolled back.
    #[error(transparent)]
    RendererUnavailable(#[from] RenderError),
}
