use rand::{rngs::SmallRng, Rng, SeedableRng};

use crate::graph::node::{GraphNode, RenderCtx};

/// White noise, uniform in [-1, 1). Has no pitch, so it takes no frequency.
pub struct WhiteNoise {
    rng: SmallRng,
}

impl WhiteNoise {
    pub fn new() -> Self {
        Self {
            rng: SmallRng::from_entropy(),
        }
    }

    /// Deterministic sequence, for offline renders that must be repeatable.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }
}

impl Default for WhiteNoise {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphNode for WhiteNoise {
    fn render_block(&mut self, out: &mut [f32], _ctx: &RenderCtx) {
        for sample in out.iter_mut() {
            *sample = self.rng.gen_range(-1.0..1.0);
        }
    }
}
