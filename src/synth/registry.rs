use std::collections::BTreeMap;

use crate::synth::voice::Voice;

/// Live voices keyed by note, at most one per note.
///
/// Nothing is ever evicted on its own: a released voice stays here, fading,
/// until the same note comes back or the caller prunes it.
#[derive(Debug, Default)]
pub struct VoiceRegistry {
    voices: BTreeMap<u8, Voice>,
}

impl VoiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.voices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }

    pub fn contains(&self, note: u8) -> bool {
        self.voices.contains_key(&note)
    }

    pub fn get(&self, note: u8) -> Option<&Voice> {
        self.voices.get(&note)
    }

    pub fn get_mut(&mut self, note: u8) -> Option<&mut Voice> {
        self.voices.get_mut(&note)
    }

    /// Register a voice under its note, handing back any voice it displaced.
    pub fn insert(&mut self, voice: Voice) -> Option<Voice> {
        self.voices.insert(voice.note(), voice)
    }

    pub fn remove(&mut self, note: u8) -> Option<Voice> {
        self.voices.remove(&note)
    }

    pub fn notes(&self) -> impl Iterator<Item = u8> + '_ {
        self.voices.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Voice> {
        self.voices.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Voice> {
        self.voices.values_mut()
    }

    /// Take out every voice whose envelopes have all gone idle by `now`.
    pub fn take_idle(&mut self, now: f64) -> Vec<Voice> {
        let idle: Vec<u8> = self
            .voices
            .iter()
            .filter(|(_, voice)| voice.is_idle(now))
            .map(|(&note, _)| note)
            .collect();

        idle.into_iter()
            .filter_map(|note| self.voices.remove(&note))
            .collect()
    }

    pub fn take_all(&mut self) -> Vec<Voice> {
        std::mem::take(&mut self.voices).into_values().collect()
    }
}
