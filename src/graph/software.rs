use tracing::warn;

use crate::{
    dsp::{
        filter::SVFilter,
        noise::WhiteNoise,
        oscillator::{PhaseOscillator, RingModulator},
        FilterKind, ParamTimeline, Waveshape,
    },
    error::RenderError,
    graph::{
        node::{GraphNode, NodeId, NodeKind, RenderCtx},
        renderer::AudioRenderer,
    },
    MAX_BLOCK_SIZE,
};

/*
Software Renderer
=================

An offline node graph that implements `AudioRenderer` with the crate's own DSP
primitives. Every node owns one block buffer. Rendering a block:

  1. clear every buffer
  2. visit nodes in topological order (sources first)
  3. a node renders into its buffer, which by then holds the sum of
     everything connected into it
  4. the buffer is added into each downstream node's buffer
  5. the destination's buffer is the block output

  [osc] ──→ [gain] ──┐
  [osc] ──→ [gain] ──┼──→ [bus] ──→ [filter] ──→ [master] ──→ [destination]
  [noise] → [gain] ──┘

Nodes live in a fixed-capacity slot pool. A handle carries the slot's
generation, so a handle to a released node never reaches the node that later
reuses its slot. Running out of slots is how this renderer reports
`RenderError::Exhausted`.

Topology edits mark the cached order dirty; it is recomputed lazily at the
next block. A cycle is never produced by the synth core, but if one appears the
nodes on it are skipped (and logged) instead of looping forever.
*/

pub const DEFAULT_NODE_CAPACITY: usize = 1024;

enum Processor {
    Oscillator(PhaseOscillator),
    Noise(WhiteNoise),
    RingModulator(RingModulator),
    Gain(ParamTimeline),
    Filter(SVFilter),
    Destination,
}

impl Processor {
    fn kind(&self) -> NodeKind {
        match self {
            Processor::Oscillator(_) => NodeKind::Oscillator,
            Processor::Noise(_) => NodeKind::Noise,
            Processor::RingModulator(_) => NodeKind::RingModulator,
            Processor::Gain(_) => NodeKind::Gain,
            Processor::Filter(_) => NodeKind::Filter,
            Processor::Destination => NodeKind::Destination,
        }
    }

    fn reset(&mut self) {
        match self {
            Processor::Oscillator(osc) => osc.reset(),
            Processor::Noise(noise) => noise.reset(),
            Processor::RingModulator(ring) => ring.reset(),
            Processor::Filter(filter) => filter.reset(),
            Processor::Gain(_) | Processor::Destination => {}
        }
    }
}

struct NodeState {
    processor: Processor,
    outputs: Vec<NodeId>,
}

struct Slot {
    generation: u32,
    node: Option<NodeState>,
}

pub struct SoftwareRenderer {
    sample_rate: f32,
    capacity: usize,
    slots: Vec<Slot>,
    buffers: Vec<Vec<f32>>,
    free: Vec<usize>,
    destination: NodeId,
    frames_rendered: u64,
    order: Vec<usize>,
    order_dirty: bool,
    noise_seed: Option<u64>,
}

impl SoftwareRenderer {
    pub fn new(sample_rate: f32) -> Self {
        Self::with_capacity(sample_rate, DEFAULT_NODE_CAPACITY)
    }

    /// `capacity` bounds the number of live nodes, not counting the destination.
    pub fn with_capacity(sample_rate: f32, capacity: usize) -> Self {
        let destination = NodeId::new(0, 0);
        Self {
            sample_rate,
            capacity,
            slots: vec![Slot {
                generation: 0,
                node: Some(NodeState {
                    processor: Processor::Destination,
                    outputs: Vec::new(),
                }),
            }],
            buffers: vec![vec![0.0; MAX_BLOCK_SIZE]],
            free: Vec::new(),
            destination,
            frames_rendered: 0,
            order: Vec::new(),
            order_dirty: true,
            noise_seed: None,
        }
    }

    /// Seed noise sources so renders are repeatable. Each new source gets the
    /// next seed in sequence.
    pub fn with_noise_seed(mut self, seed: u64) -> Self {
        self.noise_seed = Some(seed);
        self
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of live nodes, not counting the destination.
    pub fn live_nodes(&self) -> usize {
        self.slots.iter().filter(|slot| slot.node.is_some()).count() - 1
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.node(node).is_some()
    }

    pub fn node_kind(&self, node: NodeId) -> Option<NodeKind> {
        self.node(node).map(|state| state.processor.kind())
    }

    pub fn outputs(&self, node: NodeId) -> &[NodeId] {
        self.node(node)
            .map(|state| state.outputs.as_slice())
            .unwrap_or(&[])
    }

    pub fn inputs(&self, node: NodeId) -> Vec<NodeId> {
        self.connections()
            .into_iter()
            .filter(|&(_, to)| to == node)
            .map(|(from, _)| from)
            .collect()
    }

    /// Every edge in the graph, sorted.
    pub fn connections(&self) -> Vec<(NodeId, NodeId)> {
        let mut edges: Vec<(NodeId, NodeId)> = self
            .live_ids()
            .flat_map(|id| {
                self.outputs(id)
                    .iter()
                    .map(move |&to| (id, to))
                    .collect::<Vec<_>>()
            })
            .collect();
        edges.sort();
        edges
    }

    pub fn oscillator_shape(&self, node: NodeId) -> Option<Waveshape> {
        match self.node(node)?.processor {
            Processor::Oscillator(ref osc) => Some(osc.shape()),
            _ => None,
        }
    }

    pub fn oscillator_frequency(&self, node: NodeId) -> Option<f32> {
        match self.node(node)?.processor {
            Processor::Oscillator(ref osc) => Some(osc.frequency()),
            _ => None,
        }
    }

    pub fn ring_shapes(&self, node: NodeId) -> Option<(Waveshape, Waveshape)> {
        match self.node(node)?.processor {
            Processor::RingModulator(ref ring) => Some(ring.shapes()),
            _ => None,
        }
    }

    /// `(kind, cutoff_hz, resonance)` of a filter node.
    pub fn filter_settings(&self, node: NodeId) -> Option<(FilterKind, f32, f32)> {
        match self.node(node)?.processor {
            Processor::Filter(ref filter) => {
                Some((filter.kind(), filter.cutoff(), filter.resonance()))
            }
            _ => None,
        }
    }

    /// Gain automation evaluated at an arbitrary time.
    pub fn gain_at(&self, gain: NodeId, time: f64) -> Option<f32> {
        match self.node(gain)?.processor {
            Processor::Gain(ref timeline) => Some(timeline.value_at(time)),
            _ => None,
        }
    }

    /// Render `frames` samples and return them.
    pub fn render(&mut self, frames: usize) -> Vec<f32> {
        let mut out = vec![0.0; frames];
        self.render_into(&mut out);
        out
    }

    /// Render into `out`, any length.
    pub fn render_into(&mut self, out: &mut [f32]) {
        for chunk in out.chunks_mut(MAX_BLOCK_SIZE) {
            self.render_block(chunk);
        }
    }

    /// Advance the clock by at least `seconds`, discarding the audio.
    pub fn advance(&mut self, seconds: f64) {
        let frames = (seconds * self.sample_rate as f64).ceil().max(0.0) as usize;
        let mut scratch = [0.0f32; MAX_BLOCK_SIZE];
        let mut remaining = frames;
        while remaining > 0 {
            let n = remaining.min(MAX_BLOCK_SIZE);
            self.render_block(&mut scratch[..n]);
            remaining -= n;
        }
    }

    /// Render one block of at most `MAX_BLOCK_SIZE` samples.
    pub fn render_block(&mut self, out: &mut [f32]) {
        let frames = out.len().min(MAX_BLOCK_SIZE);
        let ctx = RenderCtx::new(self.sample_rate, self.now());

        if self.order_dirty {
            self.rebuild_order();
        }

        for (slot, buffer) in self.slots.iter().zip(self.buffers.iter_mut()) {
            if slot.node.is_some() {
                buffer[..frames].fill(0.0);
            }
        }

        for position in 0..self.order.len() {
            let index = self.order[position];
            let mut buffer = std::mem::take(&mut self.buffers[index]);

            let Some(state) = self.slots[index].node.as_mut() else {
                self.buffers[index] = buffer;
                continue;
            };

            let block = &mut buffer[..frames];
            match &mut state.processor {
                Processor::Oscillator(osc) => osc.render_block(block, &ctx),
                Processor::Noise(noise) => noise.render_block(block, &ctx),
                Processor::RingModulator(ring) => ring.render_block(block, &ctx),
                Processor::Filter(filter) => filter.render_block(block, &ctx),
                Processor::Gain(timeline) => {
                    for (i, sample) in block.iter_mut().enumerate() {
                        *sample *= timeline.value_at(ctx.sample_time(i));
                    }
                }
                Processor::Destination => {}
            }

            for target in &state.outputs {
                let downstream = &mut self.buffers[target.index()];
                for (acc, &sample) in downstream[..frames].iter_mut().zip(block.iter()) {
                    *acc += sample;
                }
            }

            self.buffers[index] = buffer;
        }

        out[..frames].copy_from_slice(&self.buffers[self.destination.index()][..frames]);
        self.frames_rendered += frames as u64;

        let now = self.now();
        for slot in self.slots.iter_mut() {
            if let Some(NodeState {
                processor: Processor::Gain(timeline),
                ..
            }) = slot.node.as_mut()
            {
                timeline.compact(now);
            }
        }
    }

    fn node(&self, id: NodeId) -> Option<&NodeState> {
        self.slots
            .get(id.index())
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.node.as_ref())
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut NodeState> {
        self.slots
            .get_mut(id.index())
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.node.as_mut())
    }

    fn live_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.node.is_some())
            .map(|(index, slot)| NodeId::new(index as u32, slot.generation))
    }

    fn allocate(&mut self, processor: Processor) -> Result<NodeId, RenderError> {
        if self.live_nodes() >= self.capacity {
            return Err(RenderError::Exhausted {
                capacity: self.capacity,
            });
        }

        let state = NodeState {
            processor,
            outputs: Vec::new(),
        };

        let index = match self.free.pop() {
            Some(index) => {
                self.slots[index].node = Some(state);
                index
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(state),
                });
                self.buffers.push(vec![0.0; MAX_BLOCK_SIZE]);
                self.slots.len() - 1
            }
        };

        self.order_dirty = true;
        Ok(NodeId::new(index as u32, self.slots[index].generation))
    }

    fn gain_timeline(&mut self, gain: NodeId) -> Option<&mut ParamTimeline> {
        match self.node_mut(gain) {
            Some(NodeState {
                processor: Processor::Gain(timeline),
                ..
            }) => Some(timeline),
            Some(_) => {
                warn!(node = %gain, "automation on a node that is not a gain");
                None
            }
            None => {
                warn!(node = %gain, "automation on a stale node handle");
                None
            }
        }
    }

    fn filter(&mut self, node: NodeId) -> Option<&mut SVFilter> {
        match self.node_mut(node) {
            Some(NodeState {
                processor: Processor::Filter(filter),
                ..
            }) => Some(filter),
            _ => {
                warn!(node = %node, "filter update on a node that is not a live filter");
                None
            }
        }
    }

    // Kahn's algorithm over live nodes
    fn rebuild_order(&mut self) {
        let mut indegree = vec![0usize; self.slots.len()];
        for slot in &self.slots {
            if let Some(state) = &slot.node {
                for target in &state.outputs {
                    indegree[target.index()] += 1;
                }
            }
        }

        self.order.clear();
        let mut ready: Vec<usize> = self
            .slots
            .iter()
            .enumerate()
            .filter(|(index, slot)| slot.node.is_some() && indegree[*index] == 0)
            .map(|(index, _)| index)
            .collect();

        while let Some(index) = ready.pop() {
            self.order.push(index);
            if let Some(state) = &self.slots[index].node {
                for target in &state.outputs {
                    let degree = &mut indegree[target.index()];
                    *degree -= 1;
                    if *degree == 0 {
                        ready.push(target.index());
                    }
                }
            }
        }

        let live = self.slots.iter().filter(|slot| slot.node.is_some()).count();
        if self.order.len() < live {
            warn!(
                skipped = live - self.order.len(),
                "cycle in node graph; nodes on it are not rendered"
            );
        }

        self.order_dirty = false;
    }
}

impl AudioRenderer for SoftwareRenderer {
    fn now(&self) -> f64 {
        self.frames_rendered as f64 / self.sample_rate as f64
    }

    fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    fn destination(&self) -> NodeId {
        self.destination
    }

    fn create_oscillator(
        &mut self,
        shape: Waveshape,
        frequency: f32,
    ) -> Result<NodeId, RenderError> {
        self.allocate(Processor::Oscillator(PhaseOscillator::new(shape, frequency)))
    }

    fn create_noise_source(&mut self) -> Result<NodeId, RenderError> {
        let noise = match self.noise_seed.as_mut() {
            Some(seed) => {
                let source = WhiteNoise::seeded(*seed);
                *seed = seed.wrapping_add(1);
                source
            }
            None => WhiteNoise::new(),
        };
        self.allocate(Processor::Noise(noise))
    }

    fn create_ring_modulator(
        &mut self,
        carrier: Waveshape,
        modulator: Waveshape,
        frequency: f32,
    ) -> Result<NodeId, RenderError> {
        self.allocate(Processor::RingModulator(RingModulator::new(
            carrier, modulator, frequency,
        )))
    }

    fn create_gain_node(&mut self, initial: f32) -> Result<NodeId, RenderError> {
        self.allocate(Processor::Gain(ParamTimeline::new(initial)))
    }

    fn create_filter_node(&mut self, kind: FilterKind) -> Result<NodeId, RenderError> {
        self.allocate(Processor::Filter(SVFilter::new(kind)))
    }

    fn set_value_at(&mut self, gain: NodeId, value: f32, at: f64) {
        if let Some(timeline) = self.gain_timeline(gain) {
            timeline.set_value_at(value, at);
        }
    }

    fn schedule_ramp(&mut self, gain: NodeId, target: f32, at: f64, duration: f64) {
        if let Some(timeline) = self.gain_timeline(gain) {
            timeline.ramp_to(target, at, duration);
        }
    }

    fn cancel_scheduled_after(&mut self, gain: NodeId, time: f64) {
        if let Some(timeline) = self.gain_timeline(gain) {
            timeline.cancel_after(time);
        }
    }

    fn current_value(&self, gain: NodeId) -> f32 {
        self.gain_at(gain, self.now()).unwrap_or_else(|| {
            warn!(node = %gain, "current_value on a node that is not a live gain");
            0.0
        })
    }

    fn set_filter_frequency(&mut self, filter: NodeId, hz: f32) {
        if let Some(filter) = self.filter(filter) {
            filter.set_cutoff(hz);
        }
    }

    fn set_filter_resonance(&mut self, filter: NodeId, resonance: f32) {
        if let Some(filter) = self.filter(filter) {
            filter.set_resonance(resonance);
        }
    }

    fn set_filter_kind(&mut self, filter: NodeId, kind: FilterKind) {
        if let Some(filter) = self.filter(filter) {
            filter.set_kind(kind);
        }
    }

    fn connect(&mut self, from: NodeId, to: NodeId) {
        if !self.contains(to) {
            warn!(from = %from, to = %to, "connect to a stale node handle");
            return;
        }
        let Some(state) = self.node_mut(from) else {
            warn!(from = %from, to = %to, "connect from a stale node handle");
            return;
        };
        // Connecting an existing edge again is a no-op, never a second path
        if !state.outputs.contains(&to) {
            state.outputs.push(to);
            self.order_dirty = true;
        }
    }

    /// Also clears the node's running state, so a stage that is wired back
    /// in later does not ring out what it held before.
    fn disconnect(&mut self, node: NodeId) {
        match self.node_mut(node) {
            Some(state) => {
                state.processor.reset();
                if !state.outputs.is_empty() {
                    state.outputs.clear();
                    self.order_dirty = true;
                }
            }
            None => warn!(node = %node, "disconnect on a stale node handle"),
        }
    }

    fn release_node(&mut self, node: NodeId) {
        if node == self.destination || !self.contains(node) {
            warn!(node = %node, "release of the destination or a stale node handle");
            return;
        }

        let index = node.index();
        self.slots[index].node = None;
        self.slots[index].generation = self.slots[index].generation.wrapping_add(1);
        self.free.push(index);

        // Drop edges other nodes still hold into the released node
        for slot in self.slots.iter_mut() {
            if let Some(state) = slot.node.as_mut() {
                state.outputs.retain(|&target| target != node);
            }
        }

        self.order_dirty = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const SAMPLE_RATE: f32 = 1_000.0;

    #[test]
    fn empty_graph_renders_silence() {
        let mut renderer = SoftwareRenderer::new(SAMPLE_RATE);
        let out = renderer.render(64);

        assert!(out.iter().all(|&s| s == 0.0));
        assert_abs_diff_eq!(renderer.now(), 0.064, epsilon = 1e-9);
    }

    #[test]
    fn oscillator_through_gain_reaches_destination() {
        let mut renderer = SoftwareRenderer::new(SAMPLE_RATE);
        let osc = renderer.create_oscillator(Waveshape::Square, 250.0).unwrap();
        let gain = renderer.create_gain_node(0.5).unwrap();
        let dest = renderer.destination();
        renderer.connect(osc, gain);
        renderer.connect(gain, dest);

        let out = renderer.render(4);
        assert_eq!(out, vec![0.5, 0.5, -0.5, -0.5]);
    }

    #[test]
    fn parallel_inputs_are_summed() {
        let mut renderer = SoftwareRenderer::new(SAMPLE_RATE);
        let dest = renderer.destination();
        let bus = renderer.create_gain_node(1.0).unwrap();
        for _ in 0..3 {
            let osc = renderer.create_oscillator(Waveshape::Square, 250.0).unwrap();
            renderer.connect(osc, bus);
        }
        renderer.connect(bus, dest);

        let out = renderer.render(2);
        assert_eq!(out, vec![3.0, 3.0]);
    }

    #[test]
    fn disconnect_clears_filter_memory() {
        let mut renderer = SoftwareRenderer::new(SAMPLE_RATE);
        let dest = renderer.destination();
        let osc = renderer.create_oscillator(Waveshape::Square, 250.0).unwrap();
        let filter = renderer.create_filter_node(FilterKind::LowPass).unwrap();
        renderer.connect(osc, filter);
        renderer.connect(filter, dest);
        renderer.render(6);

        // No input any more, but the filter still rings
        renderer.disconnect(osc);
        assert!(renderer.render(1)[0].abs() > 1e-3);

        renderer.disconnect(filter);
        renderer.connect(filter, dest);
        assert!(renderer.render(4).iter().all(|&s| s == 0.0));
    }

    #[test]
    fn duplicate_connect_does_not_double_sum() {
        let mut renderer = SoftwareRenderer::new(SAMPLE_RATE);
        let dest = renderer.destination();
        let osc = renderer.create_oscillator(Waveshape::Square, 250.0).unwrap();
        renderer.connect(osc, dest);
        renderer.connect(osc, dest);

        assert_eq!(renderer.connections().len(), 1);
        assert_eq!(renderer.render(1), vec![1.0]);
    }

    #[test]
    fn gain_follows_scheduled_ramp() {
        let mut renderer = SoftwareRenderer::new(SAMPLE_RATE);
        let dest = renderer.destination();
        let osc = renderer.create_oscillator(Waveshape::Square, 0.0).unwrap();
        let gain = renderer.create_gain_node(0.0).unwrap();
        renderer.connect(osc, gain);
        renderer.connect(gain, dest);

        renderer.schedule_ramp(gain, 1.0, 0.0, 1.0);
        let out = renderer.render(1_000);

        assert_abs_diff_eq!(out[500], 0.5, epsilon = 1e-4);
        assert_abs_diff_eq!(renderer.current_value(gain), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn released_handles_go_stale() {
        let mut renderer = SoftwareRenderer::new(SAMPLE_RATE);
        let first = renderer.create_gain_node(1.0).unwrap();
        renderer.release_node(first);
        let second = renderer.create_gain_node(1.0).unwrap();

        assert_eq!(first.index(), second.index(), "slot is reused");
        assert!(!renderer.contains(first));
        assert!(renderer.contains(second));
    }

    #[test]
    fn release_drops_incoming_edges() {
        let mut renderer = SoftwareRenderer::new(SAMPLE_RATE);
        let osc = renderer.create_oscillator(Waveshape::Sawtooth, 10.0).unwrap();
        let gain = renderer.create_gain_node(1.0).unwrap();
        renderer.connect(osc, gain);
        renderer.release_node(gain);

        assert!(renderer.outputs(osc).is_empty());
        assert!(renderer.connections().is_empty());
    }

    #[test]
    fn capacity_limit_reports_exhaustion() {
        let mut renderer = SoftwareRenderer::with_capacity(SAMPLE_RATE, 2);
        renderer.create_gain_node(1.0).unwrap();
        renderer.create_noise_source().unwrap();

        assert_eq!(
            renderer.create_filter_node(FilterKind::LowPass),
            Err(RenderError::Exhausted { capacity: 2 })
        );
        assert_eq!(renderer.live_nodes(), 2);
    }

    #[test]
    fn cycle_is_skipped_not_looped() {
        let mut renderer = SoftwareRenderer::new(SAMPLE_RATE);
        let a = renderer.create_gain_node(1.0).unwrap();
        let b = renderer.create_gain_node(1.0).unwrap();
        renderer.connect(a, b);
        renderer.connect(b, a);

        let out = renderer.render(16);
        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn seeded_noise_is_repeatable() {
        let render = || {
            let mut renderer = SoftwareRenderer::new(SAMPLE_RATE).with_noise_seed(9);
            let dest = renderer.destination();
            let noise = renderer.create_noise_source().unwrap();
            renderer.connect(noise, dest);
            renderer.render(32)
        };

        assert_eq!(render(), render());
    }
}
