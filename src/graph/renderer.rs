use crate::{
    dsp::{FilterKind, Waveshape},
    error::RenderError,
    graph::node::NodeId,
};

/// The rendering collaborator the synth core drives.
///
/// The core never produces samples itself. It asks the renderer for nodes,
/// wires them together, and schedules gain automation against the renderer's
/// absolute clock. Sample production happens wherever the renderer decides
/// (an audio callback, an offline bounce); the core only relies on the
/// ordering guarantees below.
///
/// Contract:
/// - Node creation is the only fallible operation. Every other call receives
///   handles the caller created and has not yet released.
/// - `cancel_scheduled_after` followed by `set_value_at`/`schedule_ramp` on the
///   same node must appear atomic to sample production.
/// - `disconnect` removes every outgoing edge of a node; incoming edges are
///   owned by their sources.
/// - `now` is monotonic.
pub trait AudioRenderer {
    /// Current absolute audio time in seconds.
    fn now(&self) -> f64;

    fn sample_rate(&self) -> f32;

    /// The final sink (speakers, bounce buffer).
    fn destination(&self) -> NodeId;

    fn create_oscillator(&mut self, shape: Waveshape, frequency: f32)
        -> Result<NodeId, RenderError>;

    fn create_noise_source(&mut self) -> Result<NodeId, RenderError>;

    /// Two shapes multiplied at one shared phase accumulator.
    fn create_ring_modulator(
        &mut self,
        carrier: Waveshape,
        modulator: Waveshape,
        frequency: f32,
    ) -> Result<NodeId, RenderError>;

    fn create_gain_node(&mut self, initial: f32) -> Result<NodeId, RenderError>;

    fn create_filter_node(&mut self, kind: FilterKind) -> Result<NodeId, RenderError>;

    // Gain automation

    fn set_value_at(&mut self, gain: NodeId, value: f32, at: f64);

    /// Ramp linearly from the value held at `at` to `target` over `duration` seconds.
    fn schedule_ramp(&mut self, gain: NodeId, target: f32, at: f64, duration: f64);

    /// Drop every automation point at or after `time`, holding the value at `time`.
    fn cancel_scheduled_after(&mut self, gain: NodeId, time: f64);

    /// Instantaneous gain at [`now`](Self::now).
    fn current_value(&self, gain: NodeId) -> f32;

    // Filter parameters

    fn set_filter_frequency(&mut self, filter: NodeId, hz: f32);

    fn set_filter_resonance(&mut self, filter: NodeId, resonance: f32);

    fn set_filter_kind(&mut self, filter: NodeId, kind: FilterKind);

    // Topology

    fn connect(&mut self, from: NodeId, to: NodeId);

    fn disconnect(&mut self, node: NodeId);

    /// Disconnect and free a node. Its handle must not be used again.
    fn release_node(&mut self, node: NodeId);
}
