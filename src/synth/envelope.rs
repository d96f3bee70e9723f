use crate::{
    error::RenderError,
    graph::{node::NodeId, renderer::AudioRenderer},
    synth::bank::EnvelopeParams,
};

/*
Scheduled ADSR Envelope
=======================

One envelope per (voice, layer). It owns a gain node and never touches
samples: `trigger` and `release` turn into automation requests on that node,
anchored at the renderer's absolute clock.

  trigger at T       cancel ≥ T, set 0 @ T, ramp → 1 over A, ramp → S over D
  release at T       read level L @ T, cancel ≥ T, set L @ T, ramp → 0 over R

The phase is never stored. It falls out of the two anchors (when we last
triggered, when we last released, each with the times it scheduled) and the
clock:

    ┌──────┐ trigger ┌───────────┐ A elapsed ┌──────────┐ D elapsed ┌────────────┐
    │ Idle │───────→ │ Attacking │─────────→ │ Decaying │─────────→ │ Sustaining │
    └──────┘         └───────────┘           └──────────┘           └────────────┘
        ↑                  │ release              │ release               │ release
        │  R elapsed       ↓                      ↓                       ↓
        └──────────── ┌───────────┐ ←─────────────┴───────────────────────┘
                      │ Releasing │
                      └───────────┘

Reading L from the renderer instead of remembering the last target is what
lets a release halfway up the attack start from halfway, not from the top.
*/

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopePhase {
    Idle,
    Attacking,
    Decaying,
    Sustaining,
    Releasing,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct TriggerAnchor {
    at: f64,
    attack: f64,
    decay: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct ReleaseAnchor {
    at: f64,
    from: f32,
    duration: f64,
}

#[derive(Debug)]
pub struct Envelope {
    gain: NodeId,
    params: EnvelopeParams,
    triggered: Option<TriggerAnchor>,
    released: Option<ReleaseAnchor>,
}

impl Envelope {
    /// Create the envelope's gain node, silent until triggered.
    pub fn new<R>(renderer: &mut R, params: EnvelopeParams) -> Result<Self, RenderError>
    where
        R: AudioRenderer + ?Sized,
    {
        let gain = renderer.create_gain_node(0.0)?;
        Ok(Self {
            gain,
            params,
            triggered: None,
            released: None,
        })
    }

    pub fn gain_node(&self) -> NodeId {
        self.gain
    }

    pub fn params(&self) -> EnvelopeParams {
        self.params
    }

    /// New times apply from the next trigger or release. The curve already
    /// scheduled, and the phase derived from it, are left alone.
    pub fn set_params(&mut self, params: EnvelopeParams) {
        self.params = params;
    }

    pub fn trigger<R>(&mut self, renderer: &mut R)
    where
        R: AudioRenderer + ?Sized,
    {
        let now = renderer.now();
        let attack = f64::from(self.params.attack);
        let decay = f64::from(self.params.decay);

        renderer.cancel_scheduled_after(self.gain, now);
        renderer.set_value_at(self.gain, 0.0, now);
        renderer.schedule_ramp(self.gain, 1.0, now, attack);
        renderer.schedule_ramp(self.gain, self.params.sustain, now + attack, decay);

        self.triggered = Some(TriggerAnchor { at: now, attack, decay });
        self.released = None;
    }

    /// Fade out from wherever the curve is right now. No-op while idle.
    pub fn release<R>(&mut self, renderer: &mut R)
    where
        R: AudioRenderer + ?Sized,
    {
        let now = renderer.now();
        if self.phase(now) == EnvelopePhase::Idle {
            return;
        }

        let from = renderer.current_value(self.gain);
        let duration = f64::from(self.params.release);
        renderer.cancel_scheduled_after(self.gain, now);
        renderer.set_value_at(self.gain, from, now);
        renderer.schedule_ramp(self.gain, 0.0, now, duration);

        self.released = Some(ReleaseAnchor { at: now, from, duration });
    }

    pub fn phase(&self, now: f64) -> EnvelopePhase {
        if let Some(release) = self.released {
            return if now - release.at >= release.duration {
                EnvelopePhase::Idle
            } else {
                EnvelopePhase::Releasing
            };
        }

        let Some(trigger) = self.triggered else {
            return EnvelopePhase::Idle;
        };

        let elapsed = now - trigger.at;
        if elapsed < trigger.attack {
            EnvelopePhase::Attacking
        } else if elapsed < trigger.attack + trigger.decay {
            EnvelopePhase::Decaying
        } else {
            EnvelopePhase::Sustaining
        }
    }

    /// Level the release ramp started from, if the envelope has been released.
    pub fn release_start_level(&self) -> Option<f32> {
        self.released.map(|release| release.from)
    }

    pub fn current_gain<R>(&self, renderer: &R) -> f32
    where
        R: AudioRenderer + ?Sized,
    {
        renderer.current_value(self.gain)
    }

    pub fn teardown<R>(self, renderer: &mut R)
    where
        R: AudioRenderer + ?Sized,
    {
        renderer.disconnect(self.gain);
        renderer.release_node(self.gain);
    }
}
