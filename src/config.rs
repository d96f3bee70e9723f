//! Engine construction settings.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    dsp::FilterKind,
    error::{Result, SynthError},
    synth::{bank::GeneratorBankSlot, filter_chain::FilterStageConfig},
};

/// Headroom for sixteen voices at full scale.
pub const DEFAULT_MASTER_GAIN: f32 = 1.0 / 16.0;
pub const DEFAULT_LAYER_COUNT: usize = 3;

/// Everything a [`SynthEngine`](crate::SynthEngine) needs at construction.
///
/// ```
/// use sidsynth::SynthConfig;
///
/// let config = SynthConfig::default()
///     .with_layer_count(2)
///     .with_note_range(36, 96);
/// assert!(config.validate().is_ok());
/// ```
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct SynthConfig {
    pub layer_count: usize,
    pub lowest_note: u8,
    pub highest_note: u8,
    pub master_gain: f32,
    /// Starting settings copied into every layer's slot.
    pub default_slot: GeneratorBankSlot,
    /// Stage presets in position order.
    pub filters: Vec<FilterStageConfig>,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            layer_count: DEFAULT_LAYER_COUNT,
            lowest_note: 0,
            highest_note: 127,
            master_gain: DEFAULT_MASTER_GAIN,
            default_slot: GeneratorBankSlot::default(),
            filters: vec![
                FilterStageConfig::new(FilterKind::LowPass),
                FilterStageConfig::new(FilterKind::HighPass),
                FilterStageConfig::new(FilterKind::BandPass),
            ],
        }
    }
}

impl SynthConfig {
    pub fn with_layer_count(mut self, layer_count: usize) -> Self {
        self.layer_count = layer_count;
        self
    }

    pub fn with_note_range(mut self, lowest: u8, highest: u8) -> Self {
        self.lowest_note = lowest;
        self.highest_note = highest;
        self
    }

    pub fn with_master_gain(mut self, gain: f32) -> Self {
        self.master_gain = gain;
        self
    }

    pub fn with_default_slot(mut self, slot: GeneratorBankSlot) -> Self {
        self.default_slot = slot;
        self
    }

    pub fn with_filters(mut self, filters: Vec<FilterStageConfig>) -> Self {
        self.filters = filters;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.layer_count == 0 {
            return Err(SynthError::InvalidConfig(
                "at least one generator layer is required".into(),
            ));
        }
        if self.lowest_note > self.highest_note || self.highest_note > 127 {
            return Err(SynthError::InvalidConfig(format!(
                "note range {}..={} is not within 0..=127",
                self.lowest_note, self.highest_note
            )));
        }
        if !self.master_gain.is_finite() || self.master_gain < 0.0 {
            return Err(SynthError::InvalidConfig(format!(
                "master gain {} must be finite and non-negative",
                self.master_gain
            )));
        }
        self.default_slot
            .validate()
            .map_err(|err| SynthError::InvalidConfig(format!("default slot: {err}")))?;
        for (index, stage) in self.filters.iter().enumerate() {
            stage
                .validate()
                .map_err(|err| SynthError::InvalidConfig(format!("filter stage {index}: {err}")))?;
        }
        Ok(())
    }

    pub fn contains_note(&self, note: u8) -> bool {
        (self.lowest_note..=self.highest_note).contains(&note)
    }
}
