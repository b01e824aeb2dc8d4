//! Immutable multi-channel sample storage.
//!
//! `SampleBuffer` is the unit of audio data passed between every stage of the
//! engine: the decoder produces one, the graph reads one, the offline
//! renderer returns a new one. Buffers are never mutated once built (every
//! transformation allocates), which is what makes it safe to share a buffer
//! between the live chain and a concurrent export via `Arc`.

use crate::error::EngineError;

/// A decoded audio asset: planar 32-bit float channels at a fixed rate.
///
/// Invariants (enforced at construction):
/// - every channel has identical length (= frame count)
/// - `sample_rate > 0`
/// - at least one channel
///
/// Sample values are *not* required to stay inside [-1, 1] internally; they
/// are clamped by [`SampleBuffer::clamped`] before any destructive
/// conversion (16-bit PCM, the external encoder).
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SampleBuffer {
    channels: Vec<Vec<f32>>,
    sample_rate: u32,
}

impl SampleBuffer {
    /// Build a buffer from planar channel data, validating the invariants.
    pub fn new(channels: Vec<Vec<f32>>, sample_rate: u32) -> Result<Self, EngineError> {
        if sample_rate == 0 {
            return Err(EngineError::InvalidParameter {
                name: "sample_rate",
                value: 0.0,
            });
        }
        let Some(first) = channels.first() else {
            return Err(EngineError::InvalidParameter {
                name: "channels",
                value: 0.0,
            });
        };
        let frames = first.len();
        if channels.iter().any(|c| c.len() != frames) {
            return Err(EngineError::InvalidParameter {
                name: "channels",
                value: frames as f32,
            });
        }

        Ok(Self {
            channels,
            sample_rate,
        })
    }

    /// An all-zero buffer. Handy for tests and for pre-sizing render output.
    pub fn silent(channel_count: usize, sample_rate: u32, frames: usize) -> Self {
        Self {
            channels: vec![vec![0.0; frames]; channel_count.max(1)],
            sample_rate: sample_rate.max(1),
        }
    }

    /// Build from interleaved samples (the layout cpal and most encoders use).
    pub fn from_interleaved(
        samples: &[f32],
        channel_count: usize,
        sample_rate: u32,
    ) -> Result<Self, EngineError> {
        if channel_count == 0 {
            return Err(EngineError::InvalidParameter {
                name: "channels",
                value: 0.0,
            });
        }
        let frames = samples.len() / channel_count;
        let mut channels = vec![Vec::with_capacity(frames); channel_count];
        for frame in samples.chunks_exact(channel_count) {
            for (ch, &s) in channels.iter_mut().zip(frame.iter()) {
                ch.push(s);
            }
        }
        Self::new(channels, sample_rate)
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn frame_count(&self) -> usize {
        self.channels[0].len()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn duration_seconds(&self) -> f64 {
        self.frame_count() as f64 / self.sample_rate as f64
    }

    /// Borrow one channel's samples.
    ///
    /// # Panics
    /// Panics if `index >= channel_count()`.
    pub fn channel(&self, index: usize) -> &[f32] {
        &self.channels[index]
    }

    pub fn channels(&self) -> &[Vec<f32>] {
        &self.channels
    }

    /// A copy with every sample clamped to [-1, 1].
    ///
    /// This is the export contract: the external encoder receives samples
    /// already inside the representable range.
    pub fn clamped(&self) -> Self {
        let channels = self
            .channels
            .iter()
            .map(|c| c.iter().map(|s| s.clamp(-1.0, 1.0)).collect())
            .collect();
        Self {
            channels,
            sample_rate: self.sample_rate,
        }
    }

    /// Interleave the channels for handoff to an encoder or device.
    pub fn to_interleaved(&self) -> Vec<f32> {
        let frames = self.frame_count();
        let chans = self.channel_count();
        let mut out = Vec::with_capacity(frames * chans);
        for i in 0..frames {
            for c in &self.channels {
                out.push(c[i]);
            }
        }
        out
    }

    /// Peak absolute sample value across all channels.
    pub fn peak(&self) -> f32 {
        self.channels
            .iter()
            .flat_map(|c| c.iter())
            .fold(0.0f32, |acc, &s| acc.max(s.abs()))
    }
}
