#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::graph::node::{GraphNode, RenderCtx};

/*
Phase Oscillators
=================

Every periodic generator in the synth is a phase accumulator: a number in
[0, 1) that advances by `frequency / sample_rate` each sample and wraps. The
waveshape maps that phase to an output sample in [-1, 1].

  phase  0.0        0.25       0.5        0.75       1.0
         │          │          │          │          │
  square ┌──────────────────────┐
         │                      └──────────────────────┘
  saw    ╱                                            ╱
  tri       ╱╲                     ╲              ╱
         ╱      ╲                      ╲      ╱

The shapes are naive (not band-limited). That matches the character of the
chip-style voices this crate is built around; aliasing at high notes is part
of the sound.

Ring Modulation
---------------
The ring modulator evaluates two shapes at the SAME phase and multiplies
them. Square × triangle gives a hollow, metallic tone whose fundamental still
tracks the played note, because both factors share one accumulator.
*/

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveshape {
    Sine,
    Square,
    Sawtooth,
    Triangle,
}

impl Waveshape {
    /// Evaluate the shape at `phase` in [0, 1).
    #[inline]
    pub fn sample(self, phase: f32) -> f32 {
        match self {
            Waveshape::Sine => (std::f32::consts::TAU * phase).sin(),
            Waveshape::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveshape::Sawtooth => 2.0 * phase - 1.0,
            Waveshape::Triangle => {
                if phase < 0.25 {
                    4.0 * phase
                } else if phase < 0.75 {
                    2.0 - 4.0 * phase
                } else {
                    4.0 * phase - 4.0
                }
            }
        }
    }
}

#[inline]
fn advance(phase: &mut f32, increment: f32) {
    *phase += increment;
    *phase -= phase.floor();
}

pub struct PhaseOscillator {
    shape: Waveshape,
    frequency: f32,
    phase: f32,
}

impl PhaseOscillator {
    pub fn new(shape: Waveshape, frequency: f32) -> Self {
        Self {
            shape,
            frequency,
            phase: 0.0,
        }
    }

    pub fn shape(&self) -> Waveshape {
        self.shape
    }

    pub fn frequency(&self) -> f32 {
        self.frequency
    }
}

impl GraphNode for PhaseOscillator {
    fn render_block(&mut self, out: &mut [f32], ctx: &RenderCtx) {
        let increment = self.frequency / ctx.sample_rate;
        for sample in out.iter_mut() {
            *sample = self.shape.sample(self.phase);
            advance(&mut self.phase, increment);
        }
    }

    fn reset(&mut self) {
        self.phase = 0.0;
    }
}

pub struct RingModulator {
    carrier: Waveshape,
    modulator: Waveshape,
    frequency: f32,
    phase: f32,
}

impl RingModulator {
    pub fn new(carrier: Waveshape, modulator: Waveshape, frequency: f32) -> Self {
        Self {
            carrier,
            modulator,
            frequency,
            phase: 0.0,
        }
    }

    pub fn shapes(&self) -> (Waveshape, Waveshape) {
        (self.carrier, self.modulator)
    }
}

impl GraphNode for RingModulator {
    fn render_block(&mut self, out: &mut [f32], ctx: &RenderCtx) {
        let increment = self.frequency / ctx.sample_rate;
        for sample in out.iter_mut() {
            *sample = self.carrier.sample(self.phase) * self.modulator.sample(self.phase);
            advance(&mut self.phase, increment);
        }
    }

    fn reset(&mut self) {
        self.phase = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(sample_rate: f32) -> RenderCtx {
        RenderCtx::new(sample_rate, 0.0)
    }

    #[test]
    fn shapes_stay_in_unit_range() {
        for shape in [
            Waveshape::Sine,
            Waveshape::Square,
            Waveshape::Sawtooth,
            Waveshape::Triangle,
        ] {
            for step in 0..1000 {
                let value = shape.sample(step as f32 / 1000.0);
                assert!((-1.0..=1.0).contains(&value), "{shape:?} produced {value}");
            }
        }
    }

    #[test]
    fn triangle_peaks_at_quarter_phase() {
        assert!((Waveshape::Triangle.sample(0.25) - 1.0).abs() < 1e-6);
        assert!((Waveshape::Triangle.sample(0.75) + 1.0).abs() < 1e-6);
        assert!(Waveshape::Triangle.sample(0.0).abs() < 1e-6);
    }

    #[test]
    fn square_period_matches_frequency() {
        // 250 Hz at 1 kHz: four samples per cycle, two high then two low
        let mut osc = PhaseOscillator::new(Waveshape::Square, 250.0);
        let mut buffer = vec![0.0; 8];
        osc.render_block(&mut buffer, &ctx(1_000.0));

        assert_eq!(buffer, vec![1.0, 1.0, -1.0, -1.0, 1.0, 1.0, -1.0, -1.0]);
    }

    #[test]
    fn ring_modulator_multiplies_shapes_at_shared_phase() {
        let mut ring = RingModulator::new(Waveshape::Square, Waveshape::Triangle, 125.0);
        let mut buffer = vec![0.0; 8];
        ring.render_block(&mut buffer, &ctx(1_000.0));

        for (i, &value) in buffer.iter().enumerate() {
            let phase = i as f32 / 8.0;
            let expected = Waveshape::Square.sample(phase) * Waveshape::Triangle.sample(phase);
            assert!((value - expected).abs() < 1e-5, "sample {i}: {value} != {expected}");
        }
    }

    #[test]
    fn reset_restarts_phase() {
        let mut osc = PhaseOscillator::new(Waveshape::Sawtooth, 250.0);
        let mut first = vec![0.0; 3];
        osc.render_block(&mut first, &ctx(1_000.0));

        osc.reset();
        let mut second = vec![0.0; 3];
        osc.render_block(&mut second, &ctx(1_000.0));

        assert_eq!(first, second);
    }
}
