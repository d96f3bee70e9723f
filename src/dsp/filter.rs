use std::f32::consts::TAU;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::graph::node::{GraphNode, RenderCtx};

/*
| kind              | passes          | rejects      |
| ----------------- | --------------- | ------------ |
| low-pass          | below cutoff    | above cutoff |
| high-pass         | above cutoff    | below cutoff |
| band-pass         | around cutoff   | both sides   |
| notch / band-stop | outside         | at cutoff    |

Topology-preserving (TPT) state-variable filter. All four responses fall out
of the same two integrators, so changing `kind` on a live filter is just a
change of which output is read; no state is discarded.

Resonance is normalised: 0.0 is the gentle Butterworth-ish response and it
approaches self-oscillation as it nears 1.0. It is clamped below 1.0 so the
damping term `k = 2 - 2 * resonance` stays positive.
*/

pub const MAX_RESONANCE: f32 = 0.98;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    LowPass,
    HighPass,
    BandPass,
    Notch,
}

pub struct FilterOutputs {
    pub lowpass: f32,
    pub bandpass: f32,
    pub highpass: f32,
    pub notch: f32,
}

pub struct SVFilter {
    ic1eq: f32, // First integrator's memory
    ic2eq: f32, // Second integrator's memory

    cutoff_hz: f32,
    resonance: f32,
    kind: FilterKind,
}

impl SVFilter {
    pub fn new(kind: FilterKind) -> Self {
        Self {
            ic1eq: 0.0,
            ic2eq: 0.0,
            cutoff_hz: 1000.0,
            resonance: 0.0,
            kind,
        }
    }

    #[inline]
    fn compute_g(&self, sample_rate: f32) -> f32 {
        // Keep the prewarp below Nyquist so tan() stays finite
        let cutoff = self.cutoff_hz.clamp(1.0, sample_rate * 0.49);
        let wd = TAU * cutoff;
        let wa = (2.0 * sample_rate) * (wd / (2.0 * sample_rate)).tan();
        wa / (2.0 * sample_rate)
    }

    pub fn next_sample(&mut self, sample: f32, k: f32, g: f32) -> FilterOutputs {
        let h = 1.0 / (1.0 + g * (g + k));
        let v3 = sample - self.ic2eq;
        let v1 = h * (self.ic1eq + g * v3);
        let v2 = self.ic2eq + g * v1;

        self.ic1eq = 2.0 * v1 - self.ic1eq;
        self.ic2eq = 2.0 * v2 - self.ic2eq;

        FilterOutputs {
            lowpass: v2,
            bandpass: v1,
            highpass: sample - k * v1 - v2,
            notch: sample - k * v1,
        }
    }

    pub fn render(&mut self, buffer: &mut [f32], sample_rate: f32) {
        let g = self.compute_g(sample_rate);
        let k = 2.0 - (2.0 * self.resonance);

        for sample in buffer.iter_mut() {
            let outputs = self.next_sample(*sample, k, g);

            *sample = match self.kind {
                FilterKind::LowPass => outputs.lowpass,
                FilterKind::HighPass => outputs.highpass,
                FilterKind::BandPass => outputs.bandpass,
                FilterKind::Notch => outputs.notch,
            }
        }
    }

    pub fn cutoff(&self) -> f32 {
        self.cutoff_hz
    }

    pub fn resonance(&self) -> f32 {
        self.resonance
    }

    pub fn kind(&self) -> FilterKind {
        self.kind
    }

    pub fn set_cutoff(&mut self, cutoff: f32) {
        self.cutoff_hz = cutoff;
    }

    pub fn set_resonance(&mut self, resonance: f32) {
        self.resonance = resonance.clamp(0.0, MAX_RESONANCE);
    }

    pub fn set_kind(&mut self, kind: FilterKind) {
        self.kind = kind;
    }
}

impl GraphNode for SVFilter {
    fn render_block(&mut self, out: &mut [f32], ctx: &RenderCtx) {
        self.render(out, ctx.sample_rate);
    }

    fn reset(&mut self) {
        self.ic1eq = 0.0;
        self.ic2eq = 0.0;
    }
}
