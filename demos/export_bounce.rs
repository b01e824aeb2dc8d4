//! Offline export demo: render a generated tone through the full chain and
//! report what came out.
//!
//! Run with: cargo run --example export_bounce

use std::sync::Arc;

use color_eyre::eyre::Result;

use remix_dsp::engine::offline;
use remix_dsp::{EffectParameters, SampleBuffer};

fn main() -> Result<()> {
    color_eyre::install()?;

    // A 440 Hz tone standing in for a decoded asset.
    let sample_rate = 44_100u32;
    let frames = sample_rate as usize * 4;
    let tone: Vec<f32> = (0..frames)
        .map(|i| (std::f32::consts::TAU * 440.0 * i as f32 / sample_rate as f32).sin() * 0.4)
        .collect();
    let source = Arc::new(SampleBuffer::new(vec![tone.clone(), tone], sample_rate)?);

    let params = EffectParameters {
        volume: 0.8,
        bass_boost: 0.5,
        tempo: 1.25,
        reverb: 0.4,
        eq_low: Some(0.6),
        eq_high: Some(0.7),
        limiter_enabled: true,
        limiter_threshold_db: -3.0,
        ..Default::default()
    };

    println!("=== export bounce ===");
    println!("source: {:.2}s at {} Hz", source.duration_seconds(), sample_rate);

    let rendered = offline::render(source, &params)?;
    let export = rendered.clamped();

    println!(
        "render: {:.2}s ({} frames), peak {:.3}",
        rendered.duration_seconds(),
        rendered.frame_count(),
        rendered.peak()
    );
    println!("export peak after clamp: {:.3}", export.peak());
    println!(
        "interleaved samples ready for the encoder: {}",
        export.to_interleaved().len()
    );

    Ok(())
}
