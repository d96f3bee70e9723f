//! Benchmarks for generator waveforms.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use sidsynth::dsp::{
    noise::WhiteNoise,
    oscillator::{PhaseOscillator, RingModulator},
    Waveshape,
};
use sidsynth::graph::node::{GraphNode, RenderCtx};

use crate::BLOCK_SIZES;

pub fn bench_oscillator(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/oscillator");
    let ctx = RenderCtx::new(48_000.0, 0.0);

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        for (name, shape) in [
            ("square", Waveshape::Square),
            ("sawtooth", Waveshape::Sawtooth),
            ("triangle", Waveshape::Triangle),
        ] {
            let mut osc = PhaseOscillator::new(shape, 440.0);
            group.bench_with_input(BenchmarkId::new(name, size), &size, |b, _| {
                b.iter(|| {
                    osc.render_block(black_box(&mut buffer), black_box(&ctx));
                })
            });
        }

        // Two shapes per sample off one accumulator
        let mut ring = RingModulator::new(Waveshape::Square, Waveshape::Triangle, 440.0);
        group.bench_with_input(BenchmarkId::new("ring_mod", size), &size, |b, _| {
            b.iter(|| {
                ring.render_block(black_box(&mut buffer), black_box(&ctx));
            })
        });

        let mut noise = WhiteNoise::seeded(7);
        group.bench_with_input(BenchmarkId::new("noise", size), &size, |b, _| {
            b.iter(|| {
                noise.render_block(black_box(&mut buffer), black_box(&ctx));
            })
        });
    }

    group.finish();
}
