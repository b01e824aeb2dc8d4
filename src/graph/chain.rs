use crate::dsp::player::SamplePlayer;
use crate::graph::stage::{FilterStage, GainStage, LimiterStage, ReverbStage};
use crate::mapping;
use crate::params::EffectParameters;

/// Frames over which an old source fades into its replacement on seek.
/// Short enough to feel instant, long enough to avoid a click.
pub const CROSSFADE_FRAMES: usize = 256;

/*
Stage order, fixed:

    player -> volume -> bass low shelf -> bass high shelf
           -> EQ x5 -> limiter -> attenuator -> reverb

Every stage is always present; parameters only flip `enabled` flags and
retune coefficients. The chain therefore has exactly one topology for any
parameter set, and the live preview and the offline export run the same
code over the same fixed-size blocks, which is what makes them match.
*/

/// The complete processing graph for one loaded asset.
///
/// Owned exclusively by whoever renders it (the audio callback, or the
/// offline loop); all mutation arrives through `&mut self`.
pub struct EffectChain {
    pub(crate) sample_rate: u32,
    pub(crate) channel_count: usize,
    pub(crate) quantum: usize,

    pub(crate) player: SamplePlayer,
    pub(crate) outgoing: Option<SamplePlayer>,
    pub(crate) fade_done: usize,

    pub(crate) volume: GainStage,
    pub(crate) bass_low: FilterStage,
    pub(crate) bass_high: FilterStage,
    pub(crate) eq: [FilterStage; 5],
    pub(crate) limiter: LimiterStage,
    pub(crate) attenuator: GainStage,
    pub(crate) reverb: ReverbStage,

    pub(crate) scratch: Vec<Vec<f32>>,
    pub(crate) fade_scratch: Vec<Vec<f32>>,
    pub(crate) read_pos: usize,
    pub(crate) tail_remaining: Option<usize>,
}

impl EffectChain {
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channel_count(&self) -> usize {
        self.channel_count
    }

    pub fn quantum(&self) -> usize {
        self.quantum
    }

    /// Current source position in seconds (the newest source during a fade).
    pub fn position_seconds(&self) -> f64 {
        self.player.position_seconds()
    }

    /// True once the source is exhausted, any crossfade has completed, and
    /// the reverb tail has fully decayed.
    pub fn finished(&self) -> bool {
        self.player.finished()
            && self.outgoing.is_none()
            && self
                .tail_remaining
                .map_or(self.reverb.tail_frames() == 0, |t| t == 0)
    }

    /// Re-apply a parameter snapshot in place. Everything here is cheap and
    /// allocation-free; a changed reverb impulse goes through
    /// [`EffectChain::replace_reverb`] instead.
    pub fn apply_params(&mut self, params: &EffectParameters) {
        let sr = self.sample_rate as f32;

        self.player.set_rate(mapping::clamp_tempo(params.tempo));

        self.volume.gain = mapping::volume_to_linear_gain(params.volume);

        let shelf_db = mapping::bass_boost_to_shelf_gain_db(params.bass_boost);
        self.bass_low.set_gain_db(sr, shelf_db);
        self.bass_low.enabled = shelf_db > 0.0;
        let complement_db = mapping::bass_boost_to_complement_gain_db(params.bass_boost);
        self.bass_high.set_gain_db(sr, complement_db);
        self.bass_high.enabled = complement_db > 0.0;

        let has_eq = params.has_eq();
        for (stage, band) in self.eq.iter_mut().zip(params.eq_bands()) {
            stage.set_gain_db(sr, mapping::eq_slider_to_db(band));
            stage.enabled = has_eq;
        }

        self.limiter
            .retune(sr, params.limiter_threshold_db, params.limiter_release_sec);
        self.limiter.enabled = params.limiter_active();

        self.attenuator.gain = mapping::attenuator_db_to_linear(params.attenuator_gain_db);
        self.attenuator.enabled = params.attenuator_active();

        self.reverb
            .set_wetness(params.reverb, mapping::REVERB_WET_MULTIPLIER);
    }

    /// Swap in a reverb stage built off the render thread (the impulse
    /// itself changed, not just the mix). Returns the displaced stage so
    /// the caller can free its convolvers somewhere that may allocate.
    #[must_use]
    pub fn replace_reverb(&mut self, reverb: ReverbStage) -> ReverbStage {
        let displaced = std::mem::replace(&mut self.reverb, reverb);
        self.tail_remaining = None;
        displaced
    }

    /// Begin a crossfaded switch to a new source position. The replacement
    /// player is built by the caller (off the render thread); this call
    /// only moves it into place.
    pub fn begin_source_swap(&mut self, player: SamplePlayer) {
        let old = std::mem::replace(&mut self.player, player);
        self.outgoing = if old.finished() { None } else { Some(old) };
        self.fade_done = 0;
        self.tail_remaining = None;
    }

    /// Render the next fixed-size block and return the planar result.
    /// Returns all-zero blocks once [`EffectChain::finished`] is true.
    pub fn next_quantum(&mut self) -> &[Vec<f32>] {
        self.render_quantum();
        self.read_pos = self.quantum;
        &self.scratch
    }

    /// Drain processed audio into an interleaved device buffer, rendering
    /// quanta as needed. Zero-fills past the end of the signal.
    pub fn fill_interleaved(&mut self, out: &mut [f32]) {
        let channels = self.channel_count;
        for frame in out.chunks_mut(channels) {
            if self.read_pos >= self.quantum {
                self.render_quantum();
                self.read_pos = 0;
            }
            for (c, sample) in frame.iter_mut().enumerate() {
                *sample = self.scratch[c][self.read_pos];
            }
            self.read_pos += 1;
        }
    }

    fn render_quantum(&mut self) {
        let frames = self.quantum;
        self.player.render_block(&mut self.scratch, frames);

        if let Some(old) = self.outgoing.as_mut() {
            old.render_block(&mut self.fade_scratch, frames);
            for i in 0..frames {
                let t = ((self.fade_done + i) as f32 / CROSSFADE_FRAMES as f32).min(1.0);
                for (new_ch, old_ch) in self.scratch.iter_mut().zip(self.fade_scratch.iter()) {
                    new_ch[i] = old_ch[i] * (1.0 - t) + new_ch[i] * t;
                }
            }
            self.fade_done += frames;
            if self.fade_done >= CROSSFADE_FRAMES {
                self.outgoing = None;
            }
        }

        self.volume.process(&mut self.scratch, frames);
        self.bass_low.process(&mut self.scratch, frames);
        self.bass_high.process(&mut self.scratch, frames);
        for band in self.eq.iter_mut() {
            band.process(&mut self.scratch, frames);
        }
        self.limiter.process(&mut self.scratch, frames);
        self.attenuator.process(&mut self.scratch, frames);
        self.reverb.process(&mut self.scratch, frames);

        if self.player.finished() && self.outgoing.is_none() {
            let tail = self
                .tail_remaining
                .get_or_insert(self.reverb.tail_frames());
            *tail = tail.saturating_sub(frames);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::SampleBuffer;
    use crate::graph::builder;
    use std::sync::Arc;

    fn silent_source(seconds: f64) -> Arc<SampleBuffer> {
        let frames = (44_100.0 * seconds) as usize;
        Arc::new(SampleBuffer::silent(2, 44_100, frames))
    }

    fn constant_source(value: f32, frames: usize) -> Arc<SampleBuffer> {
        Arc::new(SampleBuffer::new(vec![vec![value; frames]; 2], 44_100).unwrap())
    }

    #[test]
    fn silence_stays_silent_through_every_stage() {
        let params = EffectParameters {
            bass_boost: 0.8,
            reverb: 0.6,
            eq_mid: Some(0.9),
            limiter_enabled: true,
            attenuator_enabled: true,
            ..Default::default()
        };
        let mut chain = builder::build_chain(silent_source(1.0), &params, 0.0).unwrap();
        for _ in 0..8 {
            let block = chain.next_quantum();
            for ch in block {
                assert!(ch.iter().all(|&s| s.abs() < 1e-6));
            }
        }
    }

    #[test]
    fn default_params_pass_signal_through() {
        // Volume 1.0 maps to gain ~0.316, everything else at identity.
        let gain = mapping::volume_to_linear_gain(1.0);
        let mut chain =
            builder::build_chain(constant_source(0.5, 4_096), &EffectParameters::default(), 0.0)
                .unwrap();
        let block = chain.next_quantum();
        for ch in block {
            for &s in ch {
                assert!((s - 0.5 * gain).abs() < 1e-5, "sample {}", s);
            }
        }
    }

    #[test]
    fn chain_finishes_after_source_and_tail() {
        let mut chain =
            builder::build_chain(silent_source(0.05), &EffectParameters::default(), 0.0).unwrap();
        assert!(!chain.finished());
        // 0.05s at 44.1k = 2205 frames, no reverb tail: 3 quanta clears it.
        for _ in 0..3 {
            chain.next_quantum();
        }
        assert!(chain.finished());
    }

    #[test]
    fn reverb_extends_past_source_end() {
        let params = EffectParameters {
            reverb: 0.5,
            ..Default::default()
        };
        let mut chain = builder::build_chain(silent_source(0.05), &params, 0.0).unwrap();
        for _ in 0..3 {
            chain.next_quantum();
        }
        // Source is done, but two seconds of tail remain.
        assert!(!chain.finished());
    }

    #[test]
    fn crossfaded_seek_has_no_discontinuity() {
        let source = constant_source(0.8, 88_200);
        let mut chain =
            builder::build_chain(source.clone(), &EffectParameters::default(), 0.0).unwrap();
        chain.next_quantum();

        // Swap to a different position in the same constant signal: the
        // crossfade of two equal values must stay flat.
        chain.begin_source_swap(SamplePlayer::with_start(source, 1.0, 1.0));
        let gain = mapping::volume_to_linear_gain(1.0);
        let block = chain.next_quantum();
        for ch in block {
            for &s in ch {
                assert!((s - 0.8 * gain).abs() < 1e-5, "fade glitch: {}", s);
            }
        }
    }

    #[test]
    fn replace_reverb_hands_back_the_displaced_stage() {
        let params = EffectParameters {
            reverb: 0.5,
            ..Default::default()
        };
        let mut chain = builder::build_chain(silent_source(0.1), &params, 0.0).unwrap();
        let incoming = builder::build_reverb_stage(44_100, 2, chain.quantum(), 0.8);
        let incoming_tail = incoming.tail_frames();

        let displaced = chain.replace_reverb(incoming);
        assert!(displaced.tail_frames() > 0, "old convolvers leave the chain");
        assert_eq!(chain.reverb.tail_frames(), incoming_tail);
    }

    #[test]
    fn apply_params_updates_rate_in_place() {
        let mut chain =
            builder::build_chain(silent_source(1.0), &EffectParameters::default(), 0.0).unwrap();
        let params = EffectParameters {
            tempo: 1.5,
            ..Default::default()
        };
        chain.apply_params(&params);
        assert!((chain.player.rate() - 1.5).abs() < 1e-6);
    }

    #[test]
    fn seek_resumes_at_target_position() {
        let source = silent_source(2.0);
        let mut chain =
            builder::build_chain(source.clone(), &EffectParameters::default(), 0.0).unwrap();
        chain.begin_source_swap(SamplePlayer::with_start(source, 1.0, 1.5));
        assert!((chain.position_seconds() - 1.5).abs() < 1e-6);
    }
}
