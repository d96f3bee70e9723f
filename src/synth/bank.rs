#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Result, SynthError};

/// What a layer's generator produces.
///
/// `Noise` and `RingMod` are modes of their own, not toggles layered on top of
/// an oscillator: a slot is exactly one of these.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaveKind {
    Square,
    Sawtooth,
    Triangle,
    Noise,
    RingMod,
}

/// ADSR times in seconds, sustain as a level in [0, 1].
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopeParams {
    pub attack: f32,
    pub decay: f32,
    pub sustain: f32,
    pub release: f32,
}

/// One field of a [`GeneratorBankSlot`] together with its new value.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GeneratorParam {
    WaveKind(WaveKind),
    Active(bool),
    Attack(f32),
    Decay(f32),
    Sustain(f32),
    Release(f32),
}

impl GeneratorParam {
    pub fn name(&self) -> &'static str {
        match self {
            GeneratorParam::WaveKind(_) => "wave_kind",
            GeneratorParam::Active(_) => "active",
            GeneratorParam::Attack(_) => "attack",
            GeneratorParam::Decay(_) => "decay",
            GeneratorParam::Sustain(_) => "sustain",
            GeneratorParam::Release(_) => "release",
        }
    }

    /// True when the change needs a new generator, not just new envelope times.
    pub fn affects_generator(&self) -> bool {
        matches!(self, GeneratorParam::WaveKind(_) | GeneratorParam::Active(_))
    }

    pub fn validate(&self) -> Result<()> {
        match *self {
            GeneratorParam::WaveKind(_) | GeneratorParam::Active(_) => Ok(()),
            GeneratorParam::Sustain(level) => check_level(self.name(), level),
            GeneratorParam::Attack(seconds)
            | GeneratorParam::Decay(seconds)
            | GeneratorParam::Release(seconds) => check_time(self.name(), seconds),
        }
    }
}

fn check_time(name: &'static str, seconds: f32) -> Result<()> {
    if seconds.is_finite() && seconds >= 0.0 {
        Ok(())
    } else {
        Err(SynthError::InvalidParameter {
            name,
            value: seconds,
        })
    }
}

fn check_level(name: &'static str, level: f32) -> Result<()> {
    if (0.0..=1.0).contains(&level) {
        Ok(())
    } else {
        Err(SynthError::InvalidParameter { name, value: level })
    }
}

/// Timbre and envelope settings for one layer, shared by every voice.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeneratorBankSlot {
    pub wave_kind: WaveKind,
    pub active: bool,
    pub attack: f32,
    pub decay: f32,
    pub sustain: f32,
    pub release: f32,
}

impl Default for GeneratorBankSlot {
    fn default() -> Self {
        Self {
            wave_kind: WaveKind::Square,
            active: true,
            attack: 0.0,
            decay: 1.0,
            sustain: 1.0,
            release: 3.0,
        }
    }
}

impl GeneratorBankSlot {
    pub fn envelope(&self) -> EnvelopeParams {
        EnvelopeParams {
            attack: self.attack,
            decay: self.decay,
            sustain: self.sustain,
            release: self.release,
        }
    }

    /// Validate, then write. A rejected value leaves the slot untouched.
    pub fn apply(&mut self, param: GeneratorParam) -> Result<()> {
        param.validate()?;

        match param {
            GeneratorParam::WaveKind(kind) => self.wave_kind = kind,
            GeneratorParam::Active(active) => self.active = active,
            GeneratorParam::Attack(seconds) => self.attack = seconds,
            GeneratorParam::Decay(seconds) => self.decay = seconds,
            GeneratorParam::Sustain(level) => self.sustain = level,
            GeneratorParam::Release(seconds) => self.release = seconds,
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        check_time("attack", self.attack)?;
        check_time("decay", self.decay)?;
        check_level("sustain", self.sustain)?;
        check_time("release", self.release)
    }
}

/// The per-layer slots, indexed by layer.
#[derive(Debug, Clone)]
pub struct GeneratorBank {
    slots: Vec<GeneratorBankSlot>,
}

impl GeneratorBank {
    pub fn new(layer_count: usize, template: GeneratorBankSlot) -> Self {
        Self {
            slots: vec![template; layer_count],
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slots(&self) -> &[GeneratorBankSlot] {
        &self.slots
    }

    pub fn slot(&self, layer: usize) -> Result<&GeneratorBankSlot> {
        self.slots.get(layer).ok_or(SynthError::InvalidLayerIndex {
            index: layer,
            count: self.slots.len(),
        })
    }

    pub fn apply(&mut self, layer: usize, param: GeneratorParam) -> Result<()> {
        let count = self.slots.len();
        self.slots
            .get_mut(layer)
            .ok_or(SynthError::InvalidLayerIndex {
                index: layer,
                count,
            })?
            .apply(param)
    }
}
