use crate::dsp::biquad::{Biquad, BiquadCoeffs};
use crate::dsp::compressor::Limiter;
use crate::dsp::convolver::Convolver;
use crate::dsp::gain;

/// A scalar gain applied to every channel. Covers both the volume control
/// and the attenuator make-up gain.
pub struct GainStage {
    pub gain: f32,
    pub enabled: bool,
}

impl GainStage {
    pub fn new(gain: f32, enabled: bool) -> Self {
        Self { gain, enabled }
    }

    pub fn process(&mut self, channels: &mut [Vec<f32>], frames: usize) {
        if !self.enabled {
            return;
        }
        for ch in channels.iter_mut() {
            gain::apply_gain(&mut ch[..frames], self.gain);
        }
    }
}

/// Which biquad response a [`FilterStage`] computes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterKind {
    LowShelf,
    HighShelf,
    Peaking,
}

/// One biquad per channel sharing a center frequency, Q, and gain.
///
/// The stage keeps its filters (and their delay state) alive while
/// disabled, so toggling it back on mid-playback does not click.
pub struct FilterStage {
    kind: FilterKind,
    freq_hz: f32,
    q: f32,
    gain_db: f32,
    filters: Vec<Biquad>,
    pub enabled: bool,
}

impl FilterStage {
    pub fn new(
        kind: FilterKind,
        sample_rate: f32,
        freq_hz: f32,
        q: f32,
        gain_db: f32,
        channel_count: usize,
        enabled: bool,
    ) -> Self {
        let coeffs = Self::coeffs_for(kind, sample_rate, freq_hz, q, gain_db);
        Self {
            kind,
            freq_hz,
            q,
            gain_db,
            filters: (0..channel_count).map(|_| Biquad::new(coeffs)).collect(),
            enabled,
        }
    }

    fn coeffs_for(kind: FilterKind, sample_rate: f32, freq: f32, q: f32, gain_db: f32) -> BiquadCoeffs {
        match kind {
            FilterKind::LowShelf => BiquadCoeffs::low_shelf(sample_rate, freq, q, gain_db),
            FilterKind::HighShelf => BiquadCoeffs::high_shelf(sample_rate, freq, q, gain_db),
            FilterKind::Peaking => BiquadCoeffs::peaking(sample_rate, freq, q, gain_db),
        }
    }

    pub fn gain_db(&self) -> f32 {
        self.gain_db
    }

    /// Retune the gain, preserving per-channel delay state.
    pub fn set_gain_db(&mut self, sample_rate: f32, gain_db: f32) {
        if gain_db == self.gain_db {
            return;
        }
        self.gain_db = gain_db;
        let coeffs = Self::coeffs_for(self.kind, sample_rate, self.freq_hz, self.q, gain_db);
        for filter in &mut self.filters {
            filter.retune(coeffs);
        }
    }

    pub fn process(&mut self, channels: &mut [Vec<f32>], frames: usize) {
        if !self.enabled {
            return;
        }
        for (filter, ch) in self.filters.iter_mut().zip(channels.iter_mut()) {
            filter.render(&mut ch[..frames]);
        }
    }
}

/// Per-channel peak limiting.
pub struct LimiterStage {
    limiters: Vec<Limiter>,
    pub enabled: bool,
}

impl LimiterStage {
    pub fn new(
        sample_rate: f32,
        threshold_db: f32,
        release_sec: f32,
        channel_count: usize,
        enabled: bool,
    ) -> Self {
        Self {
            limiters: (0..channel_count)
                .map(|_| Limiter::new(sample_rate, threshold_db, release_sec))
                .collect(),
            enabled,
        }
    }

    pub fn retune(&mut self, sample_rate: f32, threshold_db: f32, release_sec: f32) {
        for limiter in &mut self.limiters {
            limiter.retune(sample_rate, threshold_db, release_sec);
        }
    }

    pub fn process(&mut self, channels: &mut [Vec<f32>], frames: usize) {
        if !self.enabled {
            return;
        }
        for (limiter, ch) in self.limiters.iter_mut().zip(channels.iter_mut()) {
            limiter.render(&mut ch[..frames]);
        }
    }
}

/// Convolution reverb with a dry/wet mix.
///
/// Convolvers are expensive to build (impulse FFTs), so they are only
/// present while the reverb is audible; enabling reverb mid-playback swaps
/// a freshly built set in via [`ReverbStage::replace_convolvers`].
pub struct ReverbStage {
    convolvers: Vec<Convolver>,
    wet_scratch: Vec<f32>,
    wetness: f32,
    wet_gain: f32,
    pub enabled: bool,
}

impl ReverbStage {
    pub fn bypassed(quantum: usize) -> Self {
        Self {
            convolvers: Vec::new(),
            wet_scratch: vec![0.0; quantum],
            wetness: 0.0,
            wet_gain: 0.0,
            enabled: false,
        }
    }

    pub fn new(convolvers: Vec<Convolver>, quantum: usize, wetness: f32, wet_multiplier: f32) -> Self {
        let mut stage = Self {
            convolvers,
            wet_scratch: vec![0.0; quantum],
            wetness: 0.0,
            wet_gain: 0.0,
            enabled: true,
        };
        stage.set_wetness(wetness, wet_multiplier);
        stage
    }

    /// Adjust the mix in place. Cheap; does not touch the impulse.
    pub fn set_wetness(&mut self, wetness: f32, wet_multiplier: f32) {
        self.wetness = wetness.clamp(0.0, 1.0);
        self.wet_gain = self.wetness * wet_multiplier;
        self.enabled = self.wetness > 0.0 && !self.convolvers.is_empty();
    }

    /// Swap in convolvers built elsewhere (a new impulse response).
    pub fn replace_convolvers(&mut self, convolvers: Vec<Convolver>, wetness: f32, wet_multiplier: f32) {
        self.convolvers = convolvers;
        self.set_wetness(wetness, wet_multiplier);
    }

    /// Frames of tail the reverb keeps producing after its input ends.
    pub fn tail_frames(&self) -> usize {
        if self.enabled {
            self.convolvers.first().map_or(0, |c| c.tail_frames())
        } else {
            0
        }
    }

    pub fn process(&mut self, channels: &mut [Vec<f32>], frames: usize) {
        if !self.enabled {
            return;
        }
        let dry_gain = 1.0 - self.wetness;
        for (conv, ch) in self.convolvers.iter_mut().zip(channels.iter_mut()) {
            let dry = &mut ch[..frames];
            self.wet_scratch[..frames].fill(0.0);
            conv.process_block(dry, &mut self.wet_scratch[..frames]);
            for (d, &w) in dry.iter_mut().zip(self.wet_scratch.iter()) {
                *d = *d * dry_gain + w * self.wet_gain;
            }
        }
    }
}
