use std::sync::Arc;

use remix_dsp::engine::offline;
use remix_dsp::graph::build_chain;
use remix_dsp::{EffectParameters, SampleBuffer};

fn tone(freq: f32, seconds: f64, sample_rate: u32) -> Arc<SampleBuffer> {
    let frames = (sample_rate as f64 * seconds) as usize;
    let ch: Vec<f32> = (0..frames)
        .map(|i| (std::f32::consts::TAU * freq * i as f32 / sample_rate as f32).sin() * 0.5)
        .collect();
    Arc::new(SampleBuffer::new(vec![ch.clone(), ch], sample_rate).unwrap())
}

#[test]
fn silent_export_is_silent_and_full_length() {
    let source = Arc::new(SampleBuffer::silent(2, 44_100, 220_500));
    let params = EffectParameters {
        bass_boost: 0.7,
        reverb: 0.4,
        eq_high: Some(0.8),
        limiter_enabled: true,
        attenuator_enabled: true,
        ..Default::default()
    };
    let out = offline::render(source, &params).unwrap();
    assert_eq!(out.frame_count(), 220_500);
    assert!(out.peak() < 1e-6, "silence picked up energy: {}", out.peak());
}

#[test]
fn slowed_silent_export_has_exact_length() {
    // 5s stereo silence at 44.1kHz, tempo 0.8: floor(5 * 44100 / 0.8).
    let source = Arc::new(SampleBuffer::silent(2, 44_100, 220_500));
    let params = EffectParameters {
        volume: 0.7,
        tempo: 0.8,
        reverb: 0.3,
        eq_low: Some(0.5),
        eq_low_mid: Some(0.5),
        eq_mid: Some(0.5),
        eq_high_mid: Some(0.5),
        eq_high: Some(0.5),
        ..Default::default()
    };
    let out = offline::render(source, &params).unwrap();
    assert_eq!(out.frame_count(), 275_625);
    assert_eq!(out.channel_count(), 2);
    assert!(out.peak() < 1e-6);
}

#[test]
fn export_matches_streamed_preview() {
    // The offline renderer and a block-by-block pull of the same chain must
    // produce identical samples: both are quantum-aligned over one builder.
    let source = tone(440.0, 1.0, 44_100);
    let params = EffectParameters {
        volume: 0.8,
        bass_boost: 0.5,
        reverb: 0.3,
        eq_mid: Some(0.7),
        ..Default::default()
    };

    let export = offline::render(source.clone(), &params).unwrap();

    let mut chain = build_chain(source.clone(), &params, 0.0).unwrap();
    let mut streamed: Vec<Vec<f32>> = vec![Vec::new(); 2];
    while streamed[0].len() < export.frame_count() {
        let block = chain.next_quantum();
        for (out, ch) in streamed.iter_mut().zip(block.iter()) {
            out.extend_from_slice(ch);
        }
    }

    for c in 0..2 {
        for (i, (a, b)) in export
            .channel(c)
            .iter()
            .zip(streamed[c].iter())
            .enumerate()
        {
            assert_eq!(a, b, "channel {} frame {} diverged", c, i);
        }
    }
}

#[test]
fn identity_parameters_only_apply_the_volume_curve() {
    let source = tone(440.0, 0.25, 44_100);
    let out = offline::render(source.clone(), &EffectParameters::default()).unwrap();
    let gain = remix_dsp::mapping::volume_to_linear_gain(1.0);
    for (a, b) in source.channel(0).iter().zip(out.channel(0).iter()) {
        assert!((a * gain - b).abs() < 1e-5, "expected {} got {}", a * gain, b);
    }
}

#[test]
fn attenuator_raises_level_and_limiter_caps_it() {
    let source = tone(440.0, 0.5, 44_100);

    let boosted = offline::render(
        source.clone(),
        &EffectParameters {
            attenuator_enabled: true,
            attenuator_gain_db: 12.0,
            ..Default::default()
        },
    )
    .unwrap();
    let plain = offline::render(source.clone(), &EffectParameters::default()).unwrap();
    assert!(boosted.peak() > plain.peak() * 3.0, "12 dB is ~4x");

    let limited = offline::render(
        source,
        &EffectParameters {
            attenuator_enabled: true,
            attenuator_gain_db: 12.0,
            limiter_enabled: true,
            limiter_threshold_db: -6.0,
            ..Default::default()
        },
    )
    .unwrap();
    // The limiter runs before the attenuator, so the final peak is the
    // -6 dB ceiling times the make-up gain.
    let ceiling = remix_dsp::mapping::db_to_linear(-6.0);
    let makeup = remix_dsp::mapping::db_to_linear(12.0);
    assert!(limited.peak() <= ceiling * makeup + 1e-4);
    assert!(limited.peak() < boosted.peak());
}

#[test]
fn processing_disabled_gates_dynamics() {
    let source = tone(440.0, 0.25, 44_100);
    let gated = offline::render(
        source.clone(),
        &EffectParameters {
            attenuator_enabled: true,
            attenuator_gain_db: 20.0,
            processing_enabled: false,
            ..Default::default()
        },
    )
    .unwrap();
    let plain = offline::render(source, &EffectParameters::default()).unwrap();
    assert!((gated.peak() - plain.peak()).abs() < 1e-6);
}

#[test]
fn reverb_changes_the_signal_but_not_its_length() {
    let source = tone(440.0, 0.5, 44_100);
    let dry = offline::render(source.clone(), &EffectParameters::default()).unwrap();
    let wet = offline::render(
        source,
        &EffectParameters {
            reverb: 0.6,
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(dry.frame_count(), wet.frame_count());
    let diverged = dry
        .channel(0)
        .iter()
        .zip(wet.channel(0).iter())
        .any(|(a, b)| (a - b).abs() > 1e-3);
    assert!(diverged, "reverb left the signal untouched");
}

#[test]
fn clamped_export_respects_the_encoder_contract() {
    let source = tone(220.0, 0.25, 44_100);
    let hot = offline::render(
        source,
        &EffectParameters {
            attenuator_enabled: true,
            attenuator_gain_db: 20.0,
            ..Default::default()
        },
    )
    .unwrap();
    assert!(hot.peak() > 1.0, "test needs an overdriven render");
    assert!(hot.clamped().peak() <= 1.0);
}
