use tracing::{debug, warn};

use crate::{
    error::{RenderError, Result, SynthError},
    graph::{node::NodeId, renderer::AudioRenderer},
    synth::{
        bank::{GeneratorBank, GeneratorBankSlot},
        envelope::{Envelope, EnvelopePhase},
        factory::{Generator, GeneratorFactory, GeneratorKind},
    },
};

/// Equal-tempered pitch, A4 (note 69) at 440 Hz.
pub fn note_to_frequency(note: u8) -> f32 {
    440.0 * 2.0f32.powf((f32::from(note) - 69.0) / 12.0)
}

/// One generator → envelope chain inside a voice.
#[derive(Debug)]
pub struct Layer {
    generator: Option<Generator>,
    envelope: Envelope,
}

impl Layer {
    fn build<R>(
        renderer: &mut R,
        slot: &GeneratorBankSlot,
        frequency: f32,
        bus: NodeId,
    ) -> std::result::Result<Self, RenderError>
    where
        R: AudioRenderer + ?Sized,
    {
        let envelope = Envelope::new(renderer, slot.envelope())?;

        let generator = match GeneratorKind::for_slot(slot) {
            Some(kind) => match renderer.create_generator(kind, frequency) {
                Ok(generator) => Some(generator),
                Err(err) => {
                    envelope.teardown(renderer);
                    return Err(err);
                }
            },
            None => None,
        };

        // Wire only once every node exists
        if let Some(generator) = generator {
            renderer.connect(generator.node, envelope.gain_node());
        }
        renderer.connect(envelope.gain_node(), bus);

        Ok(Self {
            generator,
            envelope,
        })
    }

    /// `None` when the layer's slot is inactive.
    pub fn generator(&self) -> Option<Generator> {
        self.generator
    }

    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    fn teardown<R>(self, renderer: &mut R)
    where
        R: AudioRenderer + ?Sized,
    {
        if let Some(generator) = self.generator {
            renderer.disconnect(generator.node);
            renderer.release_node(generator.node);
        }
        self.envelope.teardown(renderer);
    }
}

/// Everything sounding for one note: a generator and envelope per layer.
#[derive(Debug)]
pub struct Voice {
    note: u8,
    frequency: f32,
    layers: Vec<Layer>,
}

impl Voice {
    /// Build one layer per bank slot and wire each into `bus`.
    ///
    /// On failure every node created so far is released before the error is
    /// returned, so a failed voice leaves nothing behind in the renderer.
    pub fn create<R>(
        renderer: &mut R,
        note: u8,
        bank: &GeneratorBank,
        bus: NodeId,
    ) -> std::result::Result<Self, RenderError>
    where
        R: AudioRenderer + ?Sized,
    {
        let frequency = note_to_frequency(note);
        let mut layers: Vec<Layer> = Vec::with_capacity(bank.len());

        for slot in bank.slots() {
            match Layer::build(renderer, slot, frequency, bus) {
                Ok(layer) => layers.push(layer),
                Err(err) => {
                    warn!(note, built = layers.len(), error = %err, "voice creation failed");
                    for layer in layers {
                        layer.teardown(renderer);
                    }
                    return Err(err);
                }
            }
        }

        debug!(note, frequency, layers = layers.len(), "voice created");
        Ok(Self {
            note,
            frequency,
            layers,
        })
    }

    pub fn note(&self) -> u8 {
        self.note
    }

    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layer(&self, index: usize) -> Result<&Layer> {
        self.layers.get(index).ok_or(SynthError::InvalidLayerIndex {
            index,
            count: self.layers.len(),
        })
    }

    /// Bring layer `index` in line with `slot`, leaving every other layer alone.
    ///
    /// Envelope times are refreshed in place. The generator is rebuilt only
    /// when the slot now wants a different kind (or none); the replacement is
    /// created before the old one is torn down so a renderer failure keeps the
    /// layer as it was.
    pub fn regenerate_layer<R>(
        &mut self,
        renderer: &mut R,
        index: usize,
        slot: &GeneratorBankSlot,
    ) -> Result<()>
    where
        R: AudioRenderer + ?Sized,
    {
        let count = self.layers.len();
        let frequency = self.frequency;
        let layer = self
            .layers
            .get_mut(index)
            .ok_or(SynthError::InvalidLayerIndex { index, count })?;

        layer.envelope.set_params(slot.envelope());

        let wanted = GeneratorKind::for_slot(slot);
        if wanted == layer.generator.map(|generator| generator.kind) {
            return Ok(());
        }

        let replacement = match wanted {
            Some(kind) => Some(renderer.create_generator(kind, frequency)?),
            None => None,
        };

        if let Some(old) = layer.generator.take() {
            renderer.disconnect(old.node);
            renderer.release_node(old.node);
        }
        if let Some(new) = replacement {
            renderer.connect(new.node, layer.envelope.gain_node());
        }
        layer.generator = replacement;

        debug!(note = self.note, layer = index, generator = ?wanted, "layer regenerated");
        Ok(())
    }

    pub fn note_on<R>(&mut self, renderer: &mut R)
    where
        R: AudioRenderer + ?Sized,
    {
        for layer in &mut self.layers {
            layer.envelope.trigger(renderer);
        }
    }

    /// Release every envelope. The voice stays wired and keeps sounding as it fades.
    pub fn note_off<R>(&mut self, renderer: &mut R)
    where
        R: AudioRenderer + ?Sized,
    {
        for layer in &mut self.layers {
            layer.envelope.release(renderer);
        }
    }

    pub fn phases(&self, now: f64) -> Vec<EnvelopePhase> {
        self.layers
            .iter()
            .map(|layer| layer.envelope.phase(now))
            .collect()
    }

    pub fn is_idle(&self, now: f64) -> bool {
        self.layers
            .iter()
            .all(|layer| layer.envelope.phase(now) == EnvelopePhase::Idle)
    }

    /// Disconnect and release every node this voice owns.
    pub fn teardown<R>(self, renderer: &mut R)
    where
        R: AudioRenderer + ?Sized,
    {
        debug!(note = self.note, "voice torn down");
        for layer in self.layers {
            layer.teardown(renderer);
        }
    }
}
