//! The effect graph: ordered processing stages over a sample source.
//!
//! This layer wraps the [`crate::dsp`] primitives with what the engine
//! needs: a fixed stage order, per-channel fan-out, bypass flags, and
//! in-place parameter updates that never allocate on the render path.

/// Chain construction from a buffer and a parameter snapshot.
pub mod builder;
/// The fixed-order stage pipeline and its render loop.
pub mod chain;
/// Individual stage wrappers (gain, filter, limiter, reverb).
pub mod stage;

pub use builder::build_chain;
pub use chain::EffectChain;
