use tracing::{debug, info, warn};

use crate::{
    config::SynthConfig,
    dsp::FilterKind,
    error::{Result, SynthError},
    graph::{node::NodeId, renderer::AudioRenderer},
    synth::{
        bank::{GeneratorBank, GeneratorBankSlot, GeneratorParam},
        filter_chain::{FilterChain, FilterParam, FilterStageConfig},
        message::{MessageReceiver, SynthMessage},
        registry::VoiceRegistry,
        voice::Voice,
    },
};

/*
Synth Engine
============

The one object control code talks to. It owns the renderer and every node it
asks the renderer for:

  voice layers ──→ [bus] ──→ filter chain ──→ [master] ──→ destination
      ↑
  generator bank (one slot per layer, read by every voice)

Every mutating call runs to completion before returning and fans out
synchronously: a slot change reaches every live voice, a stage toggle rebuilds
the route, all before the call returns. Rejected input is rejected before
anything is written.

Lifecycle: `new` builds the fixed part of the graph (bus, filter stages,
master) and `shutdown` tears all of it down again and hands the renderer back.
*/

pub struct SynthEngine<R: AudioRenderer> {
    renderer: R,
    config: SynthConfig,
    bank: GeneratorBank,
    voices: VoiceRegistry,
    filters: FilterChain,
    bus: NodeId,
    master: NodeId,
    master_gain: f32,
}

impl<R: AudioRenderer> SynthEngine<R> {
    /// Validate `config` and build the bus, filter stages and master gain.
    ///
    /// If the renderer refuses any node, everything built so far is released
    /// and the error is returned.
    pub fn new(mut renderer: R, config: SynthConfig) -> Result<Self> {
        config.validate()?;

        let bus = renderer.create_gain_node(1.0)?;
        let master = match renderer.create_gain_node(config.master_gain) {
            Ok(master) => master,
            Err(err) => {
                renderer.release_node(bus);
                return Err(err.into());
            }
        };

        let filters = match FilterChain::new(&mut renderer, bus, master, &config.filters) {
            Ok(filters) => filters,
            Err(err) => {
                renderer.release_node(bus);
                renderer.release_node(master);
                return Err(err.into());
            }
        };

        let destination = renderer.destination();
        renderer.connect(master, destination);

        info!(
            layers = config.layer_count,
            stages = config.filters.len(),
            sample_rate = renderer.sample_rate(),
            "synth engine ready"
        );

        Ok(Self {
            bank: GeneratorBank::new(config.layer_count, config.default_slot),
            master_gain: config.master_gain,
            voices: VoiceRegistry::new(),
            renderer,
            config,
            filters,
            bus,
            master,
        })
    }

    /// Start (or restart) the voice for `note`.
    ///
    /// A note that already has a voice, fading or not, is retriggered in place.
    pub fn note_on(&mut self, note: u8) -> Result<()> {
        self.check_note(note)?;

        if let Some(voice) = self.voices.get_mut(note) {
            debug!(note, "retrigger");
            voice.note_on(&mut self.renderer);
            return Ok(());
        }

        let mut voice = Voice::create(&mut self.renderer, note, &self.bank, self.bus)?;
        voice.note_on(&mut self.renderer);
        self.voices.insert(voice);
        debug!(note, voices = self.voices.len(), "note on");
        Ok(())
    }

    /// Release the voice for `note`. A note with no voice is silently ignored.
    pub fn note_off(&mut self, note: u8) -> Result<()> {
        self.check_note(note)?;

        if let Some(voice) = self.voices.get_mut(note) {
            debug!(note, "note off");
            voice.note_off(&mut self.renderer);
        }
        Ok(())
    }

    /// Write one field of slot `layer`, then bring every live voice in line.
    ///
    /// The slot is only written if the layer and value are valid. Once written
    /// it stays written: if a voice then fails to regenerate, the slot is not
    /// rolled back, the remaining voices are still updated, and the first
    /// failure is returned. The failed voice keeps its previous generator.
    pub fn set_generator_param(&mut self, layer: usize, param: GeneratorParam) -> Result<()> {
        self.bank.apply(layer, param)?;
        let slot = *self.bank.slot(layer)?;

        let mut first_error = None;
        for voice in self.voices.iter_mut() {
            if let Err(err) = voice.regenerate_layer(&mut self.renderer, layer, &slot) {
                warn!(note = voice.note(), layer, error = %err, "layer regeneration failed");
                first_error.get_or_insert(err);
            }
        }

        debug!(layer, param = param.name(), voices = self.voices.len(), "generator param");
        first_error.map_or(Ok(()), Err)
    }

    pub fn set_filter_enabled(&mut self, stage: usize, enabled: bool) -> Result<()> {
        if self.filters.set_enabled(&mut self.renderer, stage, enabled)? {
            debug!(stage, enabled, "filter toggled");
        }
        Ok(())
    }

    pub fn set_filter_param(&mut self, stage: usize, param: FilterParam, value: f32) -> Result<()> {
        self.filters.set_param(&mut self.renderer, stage, param, value)
    }

    pub fn set_filter_kind(&mut self, stage: usize, kind: FilterKind) -> Result<()> {
        self.filters.set_kind(&mut self.renderer, stage, kind)
    }

    /// Jump the master gain to `value` now, dropping any pending automation.
    pub fn set_master_gain(&mut self, value: f32) -> Result<()> {
        if !value.is_finite() || value < 0.0 {
            return Err(SynthError::InvalidParameter {
                name: "master_gain",
                value,
            });
        }

        let now = self.renderer.now();
        self.renderer.cancel_scheduled_after(self.master, now);
        self.renderer.set_value_at(self.master, value, now);
        self.master_gain = value;
        Ok(())
    }

    /// Release every live voice.
    pub fn all_notes_off(&mut self) {
        for voice in self.voices.iter_mut() {
            voice.note_off(&mut self.renderer);
        }
    }

    /// Tear down voices whose envelopes have all finished. Returns how many.
    ///
    /// This is the only way a voice ever leaves the registry short of
    /// `shutdown`.
    pub fn prune_idle_voices(&mut self) -> usize {
        let idle = self.voices.take_idle(self.renderer.now());
        let count = idle.len();
        for voice in idle {
            voice.teardown(&mut self.renderer);
        }
        if count > 0 {
            debug!(pruned = count, remaining = self.voices.len(), "idle voices pruned");
        }
        count
    }

    pub fn dispatch(&mut self, message: SynthMessage) -> Result<()> {
        match message {
            SynthMessage::NoteOn { note } => self.note_on(note),
            SynthMessage::NoteOff { note } => self.note_off(note),
            SynthMessage::SetGeneratorParam { layer, param } => {
                self.set_generator_param(layer, param)
            }
            SynthMessage::SetFilterEnabled { stage, enabled } => {
                self.set_filter_enabled(stage, enabled)
            }
            SynthMessage::SetFilterParam {
                stage,
                param,
                value,
            } => self.set_filter_param(stage, param, value),
            SynthMessage::SetFilterKind { stage, kind } => self.set_filter_kind(stage, kind),
            SynthMessage::SetMasterGain { gain } => self.set_master_gain(gain),
            SynthMessage::AllNotesOff => {
                self.all_notes_off();
                Ok(())
            }
        }
    }

    /// Apply queued messages in order until the queue is empty or one fails.
    ///
    /// Returns how many were applied. Messages after a failing one stay queued.
    pub fn drain<M>(&mut self, receiver: &mut M) -> Result<usize>
    where
        M: MessageReceiver + ?Sized,
    {
        let mut applied = 0;
        while let Some(message) = receiver.pop() {
            self.dispatch(message).inspect_err(|err| {
                warn!(?message, error = %err, applied, "message rejected");
            })?;
            applied += 1;
        }
        Ok(applied)
    }

    /// Release every node the engine created and hand the renderer back.
    pub fn shutdown(mut self) -> R {
        for voice in self.voices.take_all() {
            voice.teardown(&mut self.renderer);
        }
        self.filters.teardown(&mut self.renderer);
        for node in [self.bus, self.master] {
            self.renderer.disconnect(node);
            self.renderer.release_node(node);
        }
        info!("synth engine shut down");
        self.renderer
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Direct access for driving the clock (rendering, advancing).
    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn config(&self) -> &SynthConfig {
        &self.config
    }

    pub fn slots(&self) -> &[GeneratorBankSlot] {
        self.bank.slots()
    }

    pub fn slot(&self, layer: usize) -> Result<&GeneratorBankSlot> {
        self.bank.slot(layer)
    }

    pub fn filter_stages(&self) -> &[FilterStageConfig] {
        self.filters.stages()
    }

    pub fn filter_chain(&self) -> &FilterChain {
        &self.filters
    }

    /// Enabled stage indices, in signal order.
    pub fn route(&self) -> &[usize] {
        self.filters.route()
    }

    pub fn voices(&self) -> &VoiceRegistry {
        &self.voices
    }

    pub fn voice(&self, note: u8) -> Option<&Voice> {
        self.voices.get(note)
    }

    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }

    pub fn master_gain(&self) -> f32 {
        self.master_gain
    }

    /// The gain node every voice layer feeds.
    pub fn bus(&self) -> NodeId {
        self.bus
    }

    pub fn master(&self) -> NodeId {
        self.master
    }

    fn check_note(&self, note: u8) -> Result<()> {
        if self.config.contains_note(note) {
            Ok(())
        } else {
            Err(SynthError::InvalidNote {
                note,
                lowest: self.config.lowest_note,
                highest: self.config.highest_note,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{graph::software::SoftwareRenderer, synth::bank::WaveKind};
    use std::collections::VecDeque;

    fn engine() -> SynthEngine<SoftwareRenderer> {
        SynthEngine::new(SoftwareRenderer::new(1_000.0), SynthConfig::default()).unwrap()
    }

    #[test]
    fn new_builds_bus_stages_and_master() {
        let engine = engine();
        let renderer = engine.renderer();

        // bus + master + three stages
        assert_eq!(renderer.live_nodes(), 5);
        assert_eq!(engine.route(), &[] as &[usize]);
        assert_eq!(renderer.outputs(engine.bus()), &[engine.master()]);
        assert_eq!(renderer.outputs(engine.master()), &[renderer.destination()]);
    }

    #[test]
    fn invalid_config_is_rejected_before_any_node() {
        let config = SynthConfig::default().with_layer_count(0);
        let result = SynthEngine::new(SoftwareRenderer::new(1_000.0), config);
        assert!(matches!(result, Err(SynthError::InvalidConfig(_))));
    }

    #[test]
    fn failed_construction_is_reported() {
        let renderer = SoftwareRenderer::with_capacity(1_000.0, 3);
        let result = SynthEngine::new(renderer, SynthConfig::default());
        assert!(matches!(result, Err(SynthError::RendererUnavailable(_))));
    }

    #[test]
    fn failed_fan_out_keeps_the_slot_write() {
        // bus, master, three stages, two full voices and nothing spare
        let renderer = SoftwareRenderer::with_capacity(1_000.0, 5 + 6 + 6);
        let mut engine = SynthEngine::new(renderer, SynthConfig::default()).unwrap();
        engine.note_on(60).unwrap();
        engine.note_on(64).unwrap();
        let first_generator = |engine: &SynthEngine<SoftwareRenderer>, note: u8| {
            let layer = engine.voice(note).unwrap().layer(0).unwrap();
            layer.generator().unwrap().node
        };
        let before = [first_generator(&engine, 60), first_generator(&engine, 64)];

        let err = engine
            .set_generator_param(0, GeneratorParam::WaveKind(WaveKind::Noise))
            .unwrap_err();

        assert!(matches!(err, SynthError::RendererUnavailable(_)));
        assert_eq!(engine.slot(0).unwrap().wave_kind, WaveKind::Noise);
        assert_eq!(
            [first_generator(&engine, 60), first_generator(&engine, 64)],
            before
        );
    }

    #[test]
    fn out_of_range_note_is_rejected() {
        let config = SynthConfig::default().with_note_range(36, 96);
        let mut engine = SynthEngine::new(SoftwareRenderer::new(1_000.0), config).unwrap();

        assert_eq!(
            engine.note_on(20),
            Err(SynthError::InvalidNote {
                note: 20,
                lowest: 36,
                highest: 96
            })
        );
        assert!(engine.note_off(100).is_err());
        assert_eq!(engine.voice_count(), 0);
    }

    #[test]
    fn master_gain_is_validated_and_applied() {
        let mut engine = engine();

        assert!(engine.set_master_gain(-1.0).is_err());
        assert_eq!(engine.master_gain(), 1.0 / 16.0);

        engine.set_master_gain(0.5).unwrap();
        let master = engine.master();
        assert_eq!(engine.renderer().current_value(master), 0.5);
    }

    #[test]
    fn bad_layer_leaves_bank_untouched() {
        let mut engine = engine();
        let before = engine.slots().to_vec();

        assert_eq!(
            engine.set_generator_param(3, GeneratorParam::WaveKind(WaveKind::Noise)),
            Err(SynthError::InvalidLayerIndex { index: 3, count: 3 })
        );
        assert_eq!(engine.slots(), before.as_slice());
    }

    #[test]
    fn drain_stops_at_first_error() {
        let mut engine = engine();
        let mut queue = VecDeque::from([
            SynthMessage::NoteOn { note: 60 },
            SynthMessage::SetFilterEnabled {
                stage: 9,
                enabled: true,
            },
            SynthMessage::NoteOn { note: 64 },
        ]);

        let err = engine.drain(&mut queue).unwrap_err();
        assert!(matches!(err, SynthError::InvalidStageIndex { index: 9, .. }));
        assert_eq!(engine.voice_count(), 1);
        assert_eq!(queue.len(), 1, "the message after the failure stays queued");
    }

    #[test]
    fn shutdown_releases_every_node() {
        let mut engine = engine();
        engine.note_on(60).unwrap();
        engine.note_on(67).unwrap();
        engine.set_filter_enabled(0, true).unwrap();

        let renderer = engine.shutdown();
        assert_eq!(renderer.live_nodes(), 0);
        assert!(renderer.connections().is_empty());
    }
}
