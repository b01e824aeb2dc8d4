//! Engine-level orchestration: transport, live playback, offline rendering,
//! and debounced parameter fan-out.
//!
//! Everything here composes the [`crate::graph`] layer; no DSP lives at
//! this level. The playback module needs an output device and is gated
//! behind the `playback` feature so the offline renderer stays usable in
//! headless environments.

/// Deterministic full-length rendering with cancellation.
pub mod offline;
/// cpal-backed live preview.
#[cfg(feature = "playback")]
pub mod playback;
/// Debounced delivery of parameter snapshots.
pub mod scheduler;
/// The playback state machine, kept pure and device-free.
pub mod transport;

pub use offline::{render, CancelToken};
pub use scheduler::{DebounceWindows, EffectUpdateScheduler};
pub use transport::{TransportCommand, TransportState};

#[cfg(feature = "playback")]
pub use playback::{AudioEngine, PlaybackController};
