//! The rendering side of the synth.
//!
//! [`renderer::AudioRenderer`] is the contract the synth core drives: node
//! creation, gain automation against an absolute clock, and connections.
//! [`software::SoftwareRenderer`] implements it offline with the crate's own
//! DSP primitives, which is what tests and benches run against.

/// Node handles, kinds and the per-block render trait.
pub mod node;
/// The renderer contract.
pub mod renderer;
/// Block-based software node graph.
pub mod software;
