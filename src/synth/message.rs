use std::collections::VecDeque;

#[cfg(feature = "rtrb")]
use rtrb::Consumer;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    dsp::FilterKind,
    synth::{bank::GeneratorParam, filter_chain::FilterParam},
};

/// One control event, as produced by a UI or MIDI front end.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum SynthMessage {
    NoteOn { note: u8 },
    NoteOff { note: u8 },
    SetGeneratorParam { layer: usize, param: GeneratorParam },
    SetFilterEnabled { stage: usize, enabled: bool },
    SetFilterParam { stage: usize, param: FilterParam, value: f32 },
    SetFilterKind { stage: usize, kind: FilterKind },
    SetMasterGain { gain: f32 },
    AllNotesOff,
}

/// Anything the engine can pull control messages from.
pub trait MessageReceiver {
    fn pop(&mut self) -> Option<SynthMessage>;
}

#[cfg(feature = "rtrb")]
impl MessageReceiver for Consumer<SynthMessage> {
    fn pop(&mut self) -> Option<SynthMessage> {
        Consumer::pop(self).ok()
    }
}

impl MessageReceiver for VecDeque<SynthMessage> {
    fn pop(&mut self) -> Option<SynthMessage> {
        self.pop_front()
    }
}
