use std::sync::Arc;

use crate::buffer::SampleBuffer;
use crate::dsp::convolver::Convolver;
use crate::dsp::player::SamplePlayer;
use crate::error::EngineError;
use crate::graph::chain::EffectChain;
use crate::graph::stage::{FilterKind, FilterStage, GainStage, LimiterStage, ReverbStage};
use crate::impulse;
use crate::mapping;
use crate::params::EffectParameters;
use crate::RENDER_QUANTUM;

/// Center frequencies of the five graphic-EQ bands.
pub const EQ_BAND_HZ: [f32; 5] = [60.0, 250.0, 1_000.0, 4_000.0, 16_000.0];
/// Q shared by the EQ bands.
pub const EQ_BAND_Q: f32 = 1.0;
/// Band responses: shelves at the extremes, peaking in between.
const EQ_BAND_KIND: [FilterKind; 5] = [
    FilterKind::LowShelf,
    FilterKind::Peaking,
    FilterKind::Peaking,
    FilterKind::Peaking,
    FilterKind::HighShelf,
];

/// Build a ready-to-render chain for `source` at `start_seconds`.
///
/// One builder serves both the live path and the offline renderer; there is
/// deliberately no mode flag. Parameters are sanitized first, so a NaN
/// slider is the only way this rejects a parameter.
pub fn build_chain(
    source: Arc<SampleBuffer>,
    params: &EffectParameters,
    start_seconds: f64,
) -> Result<EffectChain, EngineError> {
    if source.frame_count() == 0 {
        return Err(EngineError::EmptyBuffer);
    }
    let params = params.sanitized()?;

    let sample_rate = source.sample_rate();
    let sr = sample_rate as f32;
    let channel_count = source.channel_count();
    let quantum = RENDER_QUANTUM;

    let player = SamplePlayer::with_start(
        source,
        mapping::clamp_tempo(params.tempo),
        start_seconds,
    );

    let shelf_db = mapping::bass_boost_to_shelf_gain_db(params.bass_boost);
    let complement_db = mapping::bass_boost_to_complement_gain_db(params.bass_boost);
    let has_eq = params.has_eq();

    let bands = params.eq_bands();
    let eq: [FilterStage; 5] = std::array::from_fn(|i| {
        FilterStage::new(
            EQ_BAND_KIND[i],
            sr,
            EQ_BAND_HZ[i],
            EQ_BAND_Q,
            mapping::eq_slider_to_db(bands[i]),
            channel_count,
            has_eq,
        )
    });
    let reverb = if params.reverb > 0.0 {
        build_reverb_stage(sample_rate, channel_count, quantum, params.reverb)
    } else {
        ReverbStage::bypassed(quantum)
    };

    Ok(EffectChain {
        sample_rate,
        channel_count,
        quantum,
        player,
        outgoing: None,
        fade_done: 0,
        volume: GainStage::new(mapping::volume_to_linear_gain(params.volume), true),
        bass_low: FilterStage::new(
            FilterKind::LowShelf,
            sr,
            mapping::BASS_SHELF_HZ,
            mapping::BASS_SHELF_Q,
            shelf_db,
            channel_count,
            shelf_db > 0.0,
        ),
        bass_high: FilterStage::new(
            FilterKind::HighShelf,
            sr,
            mapping::BASS_COMPLEMENT_HZ,
            mapping::BASS_SHELF_Q,
            complement_db,
            channel_count,
            complement_db > 0.0,
        ),
        eq,
        limiter: LimiterStage::new(
            sr,
            params.limiter_threshold_db,
            params.limiter_release_sec,
            channel_count,
            params.limiter_active(),
        ),
        attenuator: GainStage::new(
            mapping::attenuator_db_to_linear(params.attenuator_gain_db),
            params.attenuator_active(),
        ),
        reverb,
        scratch: vec![vec![0.0; quantum]; channel_count],
        fade_scratch: vec![vec![0.0; quantum]; channel_count],
        read_pos: quantum,
        tail_remaining: None,
    })
}

/// Synthesize an impulse and build the per-channel convolvers for it.
///
/// Expensive (two seconds of FFTs); call on a control thread, never in the
/// audio callback. The impulse seed is derived from the wetness and rate,
/// so a given parameter set always renders the same reverb.
pub fn build_reverb_stage(
    sample_rate: u32,
    channel_count: usize,
    quantum: usize,
    wetness: f32,
) -> ReverbStage {
    let seed = (wetness.to_bits() as u64) << 32 | sample_rate as u64;
    let ir = impulse::synthesize_seeded(sample_rate, impulse::IMPULSE_SECONDS, wetness, seed);
    let convolvers: Vec<Convolver> = (0..channel_count)
        .map(|c| Convolver::new(ir.channel(c.min(ir.channel_count() - 1)), quantum))
        .collect();
    ReverbStage::new(convolvers, quantum, wetness, mapping::REVERB_WET_MULTIPLIER)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_buffer_is_rejected() {
        let source = Arc::new(SampleBuffer::new(vec![vec![], vec![]], 44_100).unwrap());
        let result = build_chain(source, &EffectParameters::default(), 0.0);
        assert_eq!(result.err(), Some(EngineError::EmptyBuffer));
    }

    #[test]
    fn nan_parameter_is_rejected() {
        let source = Arc::new(SampleBuffer::silent(2, 44_100, 1_000));
        let params = EffectParameters {
            reverb: f32::NAN,
            ..Default::default()
        };
        assert!(build_chain(source, &params, 0.0).is_err());
    }

    #[test]
    fn chain_inherits_source_shape() {
        let source = Arc::new(SampleBuffer::silent(2, 48_000, 1_000));
        let chain = build_chain(source, &EffectParameters::default(), 0.0).unwrap();
        assert_eq!(chain.sample_rate(), 48_000);
        assert_eq!(chain.channel_count(), 2);
        assert_eq!(chain.quantum(), RENDER_QUANTUM);
    }

    #[test]
    fn reverb_stage_is_deterministic_per_parameter_set() {
        let a = build_reverb_stage(22_050, 1, 256, 0.5);
        let b = build_reverb_stage(22_050, 1, 256, 0.5);
        assert_eq!(a.tail_frames(), b.tail_frames());
        assert!(a.enabled && b.enabled);
    }
}
