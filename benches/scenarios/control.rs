//! Control-side cost: parameter fan-out and route rebuilds.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use sidsynth::{
    synth::bank::{GeneratorParam, WaveKind},
    SoftwareRenderer, SynthConfig, SynthEngine,
};

pub fn bench_control(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/control");

    for voices in [1usize, 8, 16] {
        let mut engine =
            SynthEngine::new(SoftwareRenderer::new(48_000.0), SynthConfig::default()).unwrap();
        for note in 0..voices {
            engine.note_on(48 + note as u8).unwrap();
        }

        // Flips the generator on every live voice each iteration
        let mut noise = false;
        group.bench_with_input(
            BenchmarkId::new("wave_kind_fanout", voices),
            &voices,
            |b, _| {
                b.iter(|| {
                    noise = !noise;
                    let kind = if noise { WaveKind::Noise } else { WaveKind::Square };
                    engine
                        .set_generator_param(0, black_box(GeneratorParam::WaveKind(kind)))
                        .unwrap();
                })
            },
        );

        group.bench_with_input(
            BenchmarkId::new("envelope_fanout", voices),
            &voices,
            |b, _| {
                b.iter(|| {
                    engine
                        .set_generator_param(0, black_box(GeneratorParam::Release(0.5)))
                        .unwrap();
                })
            },
        );
    }

    let mut engine =
        SynthEngine::new(SoftwareRenderer::new(48_000.0), SynthConfig::default()).unwrap();
    let mut enabled = false;
    group.bench_function("route_rebuild", |b| {
        b.iter(|| {
            enabled = !enabled;
            engine.set_filter_enabled(black_box(1), enabled).unwrap();
        })
    });

    group.finish();
}
