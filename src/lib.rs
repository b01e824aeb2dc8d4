pub mod buffer;
pub mod dsp;
pub mod engine; // Playback, offline rendering, parameter scheduling
pub mod error;
pub mod graph; // The ordered effect pipeline
pub mod impulse;
pub mod mapping; // Slider-to-engine unit conversions
pub mod params;

/// Frames per render block. Both the live callback and the offline renderer
/// pull the chain in blocks of exactly this size, which keeps the
/// partitioned convolver aligned and makes preview and export match.
pub const RENDER_QUANTUM: usize = 1024;

pub use buffer::SampleBuffer;
pub use error::EngineError;
pub use graph::{build_chain, EffectChain};
pub use params::EffectParameters;
