//! Low-level DSP primitives used by the effect-chain stages.
//!
//! These components are allocation-free in their render paths and safe to
//! run inside the audio callback. They stay focused on the signal-processing
//! math; the [`crate::graph`] layer handles ordering, bypass, and parameter
//! plumbing. The one exception to "allocation-free" is construction: a
//! [`convolver::Convolver`] allocates its FFT scratch up front and never
//! again.

/// RBJ cookbook biquad filters (shelves and peaking EQ).
pub mod biquad;
/// Peak limiter built on an envelope follower.
pub mod compressor;
/// Uniformly-partitioned FFT convolution.
pub mod convolver;
/// Scalar gain helpers.
pub mod gain;
/// Variable-rate sample playback with linear interpolation.
pub mod player;
