//! Rendering held chords through the full engine graph.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use sidsynth::{
    synth::bank::{GeneratorParam, WaveKind},
    SoftwareRenderer, SynthConfig, SynthEngine,
};

use crate::BLOCK_SIZES;

fn chord_engine(notes: &[u8], filters: &[usize]) -> SynthEngine<SoftwareRenderer> {
    let renderer = SoftwareRenderer::new(48_000.0).with_noise_seed(1);
    let mut engine = SynthEngine::new(renderer, SynthConfig::default()).unwrap();

    engine
        .set_generator_param(1, GeneratorParam::WaveKind(WaveKind::Sawtooth))
        .unwrap();
    engine
        .set_generator_param(2, GeneratorParam::WaveKind(WaveKind::RingMod))
        .unwrap();
    for &stage in filters {
        engine.set_filter_enabled(stage, true).unwrap();
    }
    for &note in notes {
        engine.note_on(note).unwrap();
    }
    engine
}

pub fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/render");

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        // Single note, bus straight to master
        let mut mono = chord_engine(&[57], &[]);
        group.bench_with_input(BenchmarkId::new("mono_dry", size), &size, |b, _| {
            b.iter(|| {
                mono.renderer_mut().render_into(black_box(&mut buffer));
            })
        });

        // Four-note chord through two filter stages
        let mut chord = chord_engine(&[48, 55, 60, 64], &[0, 2]);
        group.bench_with_input(BenchmarkId::new("chord4_filtered", size), &size, |b, _| {
            b.iter(|| {
                chord.renderer_mut().render_into(black_box(&mut buffer));
            })
        });

        // Sixteen voices, the headroom the default master gain is sized for
        let notes: Vec<u8> = (40..56).collect();
        let mut full = chord_engine(&notes, &[0, 1, 2]);
        group.bench_with_input(BenchmarkId::new("poly16_filtered", size), &size, |b, _| {
            b.iter(|| {
                full.renderer_mut().render_into(black_box(&mut buffer));
            })
        });
    }

    group.finish();
}
