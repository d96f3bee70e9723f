use std::fmt;

/// Context passed to nodes while a block is rendered
///
/// - sample_rate: Audio sample rate (e.g., 48000.0)
/// - time: Absolute renderer time of the first sample in the block (seconds)
#[derive(Debug, Clone, Copy)]
pub struct RenderCtx {
    pub sample_rate: f32,
    pub time: f64,
}

impl RenderCtx {
    pub fn new(sample_rate: f32, time: f64) -> Self {
        Self { sample_rate, time }
    }

    /// Absolute time of sample `index` within the current block.
    #[inline]
    pub fn sample_time(&self, index: usize) -> f64 {
        self.time + index as f64 / self.sample_rate as f64
    }
}

/// Core trait for block-processing nodes
///
/// `out` arrives holding the summed input of every node connected upstream.
/// Sources overwrite it; processors (gain, filter) transform it in place.
pub trait GraphNode: Send {
    fn render_block(&mut self, out: &mut [f32], ctx: &RenderCtx);

    /// Clear any internal state (phase, filter memory).
    ///
    /// Default implementation does nothing (stateless nodes).
    fn reset(&mut self) {}
}

/// Handle to a node owned by a renderer.
///
/// The generation counter keeps a handle from aliasing a newer node that
/// reuses the same slot after the original was released.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl NodeId {
    pub(crate) fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    pub(crate) fn index(self) -> usize {
        self.index as usize
    }

    pub(crate) fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

/// What a node does, without its state. Used for graph inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Oscillator,
    Noise,
    RingModulator,
    Gain,
    Filter,
    Destination,
}
