// Purpose: voices, envelopes, generator bank and filter routing
// This layer drives an `AudioRenderer`; it never produces samples itself

pub mod bank;
pub mod engine;
pub mod envelope;
pub mod factory;
pub mod filter_chain;
pub mod message;
pub mod registry;
pub mod voice;
