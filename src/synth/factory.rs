use crate::{
    dsp::Waveshape,
    error::RenderError,
    graph::{node::NodeId, renderer::AudioRenderer},
    synth::bank::{GeneratorBankSlot, WaveKind},
};

/// The concrete signal source a layer runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorKind {
    /// A pitched oscillator of one shape.
    Periodic(Waveshape),
    /// Unpitched white noise.
    Noise,
    /// Two shapes multiplied at one phase accumulator.
    RingMod(Waveshape, Waveshape),
}

impl From<WaveKind> for GeneratorKind {
    fn from(kind: WaveKind) -> Self {
        match kind {
            WaveKind::Square => GeneratorKind::Periodic(Waveshape::Square),
            WaveKind::Sawtooth => GeneratorKind::Periodic(Waveshape::Sawtooth),
            WaveKind::Triangle => GeneratorKind::Periodic(Waveshape::Triangle),
            WaveKind::Noise => GeneratorKind::Noise,
            WaveKind::RingMod => GeneratorKind::RingMod(Waveshape::Square, Waveshape::Triangle),
        }
    }
}

impl GeneratorKind {
    /// The generator a slot calls for, or `None` when the slot is switched off.
    pub fn for_slot(slot: &GeneratorBankSlot) -> Option<Self> {
        slot.active.then(|| slot.wave_kind.into())
    }
}

/// A generator node built for one (voice, layer) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Generator {
    pub node: NodeId,
    pub kind: GeneratorKind,
}

/// Builds generators from a [`GeneratorKind`] and a note frequency.
///
/// Every renderer is a factory; the trait exists so voice code reads in terms
/// of generators rather than raw node calls.
pub trait GeneratorFactory {
    fn create_generator(
        &mut self,
        kind: GeneratorKind,
        frequency: f32,
    ) -> Result<Generator, RenderError>;
}

impl<R> GeneratorFactory for R
where
    R: AudioRenderer + ?Sized,
{
    fn create_generator(
        &mut self,
        kind: GeneratorKind,
        frequency: f32,
    ) -> Result<Generator, RenderError> {
        let node = match kind {
            GeneratorKind::Periodic(shape) => self.create_oscillator(shape, frequency)?,
            GeneratorKind::Noise => self.create_noise_source()?,
            GeneratorKind::RingMod(carrier, modulator) => {
                self.create_ring_modulator(carrier, modulator, frequency)?
            }
        };
        Ok(Generator { node, kind })
    }
}
