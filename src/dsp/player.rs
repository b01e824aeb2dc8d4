use std::sync::Arc;

use crate::buffer::SampleBuffer;

/*
Tempo is implemented as variable-rate playback: a read cursor advances
through the source by `rate` frames per output frame and fractional
positions are linearly interpolated. rate > 1 plays faster (and raises
pitch), rate < 1 plays slower. This is the resampling approach, not a
pitch-preserving time stretch.
*/

/// Reads a shared immutable buffer at an adjustable rate.
///
/// Cheap to construct (the buffer is behind an `Arc`), so seeking is done
/// by building a replacement player at the target position and swapping it
/// in rather than by mutating a live one.
pub struct SamplePlayer {
    source: Arc<SampleBuffer>,
    position: f64,
    rate: f64,
}

impl SamplePlayer {
    pub fn new(source: Arc<SampleBuffer>, rate: f32) -> Self {
        Self::with_start(source, rate, 0.0)
    }

    /// Start reading at `start_seconds` into the source (clamped to its end).
    pub fn with_start(source: Arc<SampleBuffer>, rate: f32, start_seconds: f64) -> Self {
        let start_frame = (start_seconds.max(0.0) * source.sample_rate() as f64)
            .min(source.frame_count() as f64);
        Self {
            source,
            position: start_frame,
            rate: rate.max(0.01) as f64,
        }
    }

    pub fn source(&self) -> &Arc<SampleBuffer> {
        &self.source
    }

    pub fn rate(&self) -> f32 {
        self.rate as f32
    }

    /// Change the playback rate in place. The cursor keeps its position, so
    /// a mid-playback tempo change is gapless.
    pub fn set_rate(&mut self, rate: f32) {
        self.rate = rate.max(0.01) as f64;
    }

    /// Current read position in source frames (fractional).
    pub fn position_frames(&self) -> f64 {
        self.position
    }

    pub fn position_seconds(&self) -> f64 {
        self.position / self.source.sample_rate() as f64
    }

    /// True once the cursor has moved past the last source frame.
    pub fn finished(&self) -> bool {
        self.position >= self.source.frame_count() as f64
    }

    /// Fill one block of planar output, advancing the cursor. All output
    /// slices advance in lockstep from a single cursor so channels stay
    /// phase-aligned. Returns how many frames carried signal; the remainder
    /// of each slice is zero-filled.
    pub fn render_block(&mut self, outputs: &mut [Vec<f32>], frames: usize) -> usize {
        let source_frames = self.source.frame_count();
        let mut produced = 0;

        for i in 0..frames {
            if self.position >= source_frames as f64 {
                for ch in outputs.iter_mut() {
                    ch[i] = 0.0;
                }
                continue;
            }

            let idx = self.position as usize;
            let frac = (self.position - idx as f64) as f32;
            for (c, out) in outputs.iter_mut().enumerate() {
                // Source may have fewer channels than the output (mono into
                // a stereo device); reuse the last source channel.
                let src = self.source.channel(c.min(self.source.channel_count() - 1));
                let a = src[idx];
                let b = if idx + 1 < source_frames { src[idx + 1] } else { 0.0 };
                out[i] = a + (b - a) * frac;
            }

            self.position += self.rate;
            produced = i + 1;
        }
        produced
    }
}
