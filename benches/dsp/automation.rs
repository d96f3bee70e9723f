//! Benchmarks for gain automation lookups.
//!
//! The software renderer evaluates the timeline once per sample per gain node,
//! so `value_at` is on the hot path for every voice layer.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use sidsynth::dsp::ParamTimeline;

use crate::BLOCK_SIZES;

pub fn bench_automation(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/automation");
    let dt = 1.0 / 48_000.0;

    let mut adsr = ParamTimeline::new(0.0);
    adsr.set_value_at(0.0, 0.0);
    adsr.ramp_to(1.0, 0.0, 0.01);
    adsr.ramp_to(0.6, 0.01, 0.1);

    // A release landing mid-decay
    let mut released = adsr.clone();
    released.cancel_after(0.05);
    let held = released.value_at(0.05);
    released.set_value_at(held, 0.05);
    released.ramp_to(0.0, 0.05, 0.2);

    for &size in BLOCK_SIZES {
        for (name, timeline) in [("adsr", &adsr), ("released", &released)] {
            group.bench_with_input(BenchmarkId::new(name, size), &size, |b, &size| {
                b.iter(|| {
                    let mut acc = 0.0f32;
                    for i in 0..size {
                        acc += timeline.value_at(black_box(0.04 + i as f64 * dt));
                    }
                    acc
                })
            });
        }
    }

    group.finish();
}
