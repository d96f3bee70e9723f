#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    dsp::FilterKind,
    error::{RenderError, Result, SynthError},
    graph::{node::NodeId, renderer::AudioRenderer},
};

/*
Filter Chain
============

A fixed row of filter stages sits between the voice bus and the master gain.
Stages never move; each one is only switched in or out. The live path is the
enabled stages in position order:

  stages   [0: off] [1: on] [2: on]
  route    bus ──→ [1] ──→ [2] ──→ master

  stages   [0: off] [1: off] [2: off]
  route    bus ──────────────────→ master

Deciding the route (`compute_route`) is kept apart from acting on it
(`FilterChain::rebuild_route`). A rebuild always cuts every edge the chain
could own (the bus output and every stage output) before laying down the new
path, so whatever state the previous route was left in, nothing is ever
summed twice.
*/

/// Settings for one stage position.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterStageConfig {
    pub enabled: bool,
    pub kind: FilterKind,
    pub frequency: f32,
    pub resonance: f32,
}

impl FilterStageConfig {
    pub fn new(kind: FilterKind) -> Self {
        Self {
            enabled: false,
            kind,
            frequency: 1000.0,
            resonance: 0.0,
        }
    }

    pub fn validate(&self) -> Result<()> {
        FilterParam::Frequency.validate(self.frequency)?;
        FilterParam::Resonance.validate(self.resonance)
    }
}

/// The continuous per-stage parameters.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterParam {
    /// Cutoff or centre frequency in Hz, finite and above zero.
    Frequency,
    /// Normalised resonance in [0, 1).
    Resonance,
}

impl FilterParam {
    pub fn name(&self) -> &'static str {
        match self {
            FilterParam::Frequency => "frequency",
            FilterParam::Resonance => "resonance",
        }
    }

    pub fn validate(&self, value: f32) -> Result<()> {
        let ok = match self {
            FilterParam::Frequency => value.is_finite() && value > 0.0,
            FilterParam::Resonance => (0.0..1.0).contains(&value),
        };
        if ok {
            Ok(())
        } else {
            Err(SynthError::InvalidParameter {
                name: self.name(),
                value,
            })
        }
    }
}

/// Indices of the enabled stages, in position order.
pub fn compute_route(stages: &[FilterStageConfig]) -> Vec<usize> {
    stages
        .iter()
        .enumerate()
        .filter(|(_, stage)| stage.enabled)
        .map(|(index, _)| index)
        .collect()
}

#[derive(Debug)]
pub struct FilterChain {
    input: NodeId,
    output: NodeId,
    stages: Vec<FilterStageConfig>,
    nodes: Vec<NodeId>,
    route: Vec<usize>,
}

impl FilterChain {
    /// Create one filter node per stage and route `input` to `output` through
    /// the enabled ones. The chain does not own `input` or `output`.
    pub fn new<R>(
        renderer: &mut R,
        input: NodeId,
        output: NodeId,
        stages: &[FilterStageConfig],
    ) -> std::result::Result<Self, RenderError>
    where
        R: AudioRenderer + ?Sized,
    {
        let mut nodes = Vec::with_capacity(stages.len());
        for stage in stages {
            match renderer.create_filter_node(stage.kind) {
                Ok(node) => {
                    renderer.set_filter_frequency(node, stage.frequency);
                    renderer.set_filter_resonance(node, stage.resonance);
                    nodes.push(node);
                }
                Err(err) => {
                    for node in nodes {
                        renderer.release_node(node);
                    }
                    return Err(err);
                }
            }
        }

        let mut chain = Self {
            input,
            output,
            stages: stages.to_vec(),
            nodes,
            route: Vec::new(),
        };
        chain.rebuild_route(renderer);
        Ok(chain)
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn stages(&self) -> &[FilterStageConfig] {
        &self.stages
    }

    pub fn stage(&self, index: usize) -> Result<&FilterStageConfig> {
        self.stages.get(index).ok_or_else(|| self.bad_index(index))
    }

    pub fn node(&self, index: usize) -> Option<NodeId> {
        self.nodes.get(index).copied()
    }

    /// Stage indices on the live path, as of the last rebuild.
    pub fn route(&self) -> &[usize] {
        &self.route
    }

    /// Full node path from input to output, as of the last rebuild.
    pub fn route_nodes(&self) -> Vec<NodeId> {
        std::iter::once(self.input)
            .chain(self.route.iter().map(|&index| self.nodes[index]))
            .chain(std::iter::once(self.output))
            .collect()
    }

    /// Cut every edge the chain owns, then connect the enabled stages in order.
    pub fn rebuild_route<R>(&mut self, renderer: &mut R)
    where
        R: AudioRenderer + ?Sized,
    {
        renderer.disconnect(self.input);
        for &node in &self.nodes {
            renderer.disconnect(node);
        }

        self.route = compute_route(&self.stages);

        let mut upstream = self.input;
        for &index in &self.route {
            let node = self.nodes[index];
            renderer.connect(upstream, node);
            upstream = node;
        }
        renderer.connect(upstream, self.output);

        debug!(route = ?self.route, "filter route rebuilt");
    }

    /// Returns whether the flag actually changed. The route is rebuilt only then.
    pub fn set_enabled<R>(&mut self, renderer: &mut R, index: usize, enabled: bool) -> Result<bool>
    where
        R: AudioRenderer + ?Sized,
    {
        let stage = self.stage_mut(index)?;
        if stage.enabled == enabled {
            return Ok(false);
        }
        stage.enabled = enabled;
        self.rebuild_route(renderer);
        Ok(true)
    }

    /// Live update of one stage's node. Never touches the route.
    pub fn set_param<R>(
        &mut self,
        renderer: &mut R,
        index: usize,
        param: FilterParam,
        value: f32,
    ) -> Result<()>
    where
        R: AudioRenderer + ?Sized,
    {
        let node = self.nodes.get(index).copied().ok_or_else(|| self.bad_index(index))?;
        param.validate(value)?;

        let stage = self.stage_mut(index)?;
        match param {
            FilterParam::Frequency => {
                stage.frequency = value;
                renderer.set_filter_frequency(node, value);
            }
            FilterParam::Resonance => {
                stage.resonance = value;
                renderer.set_filter_resonance(node, value);
            }
        }
        Ok(())
    }

    pub fn set_kind<R>(&mut self, renderer: &mut R, index: usize, kind: FilterKind) -> Result<()>
    where
        R: AudioRenderer + ?Sized,
    {
        let node = self.nodes.get(index).copied().ok_or_else(|| self.bad_index(index))?;
        self.stage_mut(index)?.kind = kind;
        renderer.set_filter_kind(node, kind);
        Ok(())
    }

    /// Unhook from the input and release every stage node.
    pub fn teardown<R>(self, renderer: &mut R)
    where
        R: AudioRenderer + ?Sized,
    {
        renderer.disconnect(self.input);
        for node in self.nodes {
            renderer.disconnect(node);
            renderer.release_node(node);
        }
    }

    fn stage_mut(&mut self, index: usize) -> Result<&mut FilterStageConfig> {
        let err = self.bad_index(index);
        self.stages.get_mut(index).ok_or(err)
    }

    fn bad_index(&self, index: usize) -> SynthError {
        SynthError::InvalidStageIndex {
            index,
            count: self.stages.len(),
        }
    }
}
