//! Live preview demo: play a generated tone through the default output
//! device, nudge parameters mid-flight, seek, and wait for the end.
//!
//! Run with: cargo run --example live_preview

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use color_eyre::eyre::Result;

use remix_dsp::engine::playback::PlaybackController;
use remix_dsp::{EffectParameters, SampleBuffer};

fn main() -> Result<()> {
    color_eyre::install()?;

    let sample_rate = 44_100u32;
    let frames = sample_rate as usize * 8;
    let tone: Vec<f32> = (0..frames)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            (std::f32::consts::TAU * 220.0 * t).sin() * 0.3
        })
        .collect();
    let source = Arc::new(SampleBuffer::new(vec![tone.clone(), tone], sample_rate)?);

    println!("=== live preview ===");
    println!("source: {:.2}s", source.duration_seconds());

    let mut params = EffectParameters::default();
    let mut controller = PlaybackController::new(source, &params)?;
    controller.play()?;

    // Two seconds dry, then turn the reverb up and seek back a bit.
    thread::sleep(Duration::from_secs(2));
    params.reverb = 0.5;
    params.bass_boost = 0.6;
    controller.set_params(&params)?;
    println!("reverb on at {:.2}s", controller.position_seconds());

    thread::sleep(Duration::from_secs(1));
    controller.seek(1.0)?;
    println!("seeked back to 1.0s");

    loop {
        if controller.take_finished() {
            println!("signal ended at {:.2}s", controller.position_seconds());
            break;
        }
        thread::sleep(Duration::from_millis(100));
    }

    Ok(())
}
