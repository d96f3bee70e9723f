//! Engine-level scenario benchmarks.
//!
//! These drive `SynthEngine` over the software renderer the way a host would:
//! hold a chord and render blocks, or hammer the control side.

mod control;
mod render;

pub use control::bench_control;
pub use render::bench_render;
