//! Procedural impulse-response synthesis for the convolution reverb.
//!
//! Instead of shipping recorded room responses, the reverb space is
//! synthesized from a single "wetness" control: shaped noise under a pair of
//! decay envelopes, with deterministic early/late reflection terms layered
//! on top. Synthesis is cheap enough to run on the control thread but far
//! too expensive to run per parameter tick, so the engine generates one
//! impulse per parameter set and reuses it until the reverb amount itself
//! changes (debounced upstream).

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::buffer::SampleBuffer;

/// Impulse length used by the effect chain: a two second reverb tail.
pub const IMPULSE_SECONDS: f64 = 2.0;

/// Synthesize a stereo impulse response.
///
/// Per channel, for each sample index `i` over `L = sample_rate * duration`:
///
/// ```text
/// t = i / L
/// p = (1 - t)^(0.8 + wetness * 0.5)        primary decay
/// q = (1 - 0.7t)^(1.5 + wetness)           secondary, slower decay
/// e = sin(50t) * exp(-10t) * 0.3           early reflections
/// r = sin(15t) * exp(-3t)  * 0.2           late reflections
/// s = (u*p*0.6 + u'*q*0.4 + e + r) * (0.7 + wetness * 0.3)
/// ```
///
/// where `u`, `u'` are independent uniform draws in [-1, 1]. The noise
/// source is seeded per call, so one synthesis is internally deterministic;
/// two syntheses share envelope and character but not exact samples.
pub fn synthesize(sample_rate: u32, duration_sec: f64, wetness: f32) -> SampleBuffer {
    synthesize_seeded(sample_rate, duration_sec, wetness, seed_from_entropy())
}

/// Synthesize with an explicit seed. Used by tests to pin the noise source.
pub fn synthesize_seeded(
    sample_rate: u32,
    duration_sec: f64,
    wetness: f32,
    seed: u64,
) -> SampleBuffer {
    let wetness = wetness.max(0.0);
    let len = (sample_rate as f64 * duration_sec.max(0.0)) as usize;
    let mut rng = SmallRng::seed_from_u64(seed);

    let channels = vec![
        render_channel(len, wetness, &mut rng),
        render_channel(len, wetness, &mut rng),
    ];
    SampleBuffer::new(channels, sample_rate.max(1))
        .unwrap_or_else(|_| SampleBuffer::silent(2, sample_rate.max(1), len))
}

fn render_channel(len: usize, wetness: f32, rng: &mut SmallRng) -> Vec<f32> {
    let mut out = Vec::with_capacity(len);
    let trim = 0.7 + wetness * 0.3;
    let primary_exp = 0.8 + wetness * 0.5;
    let secondary_exp = 1.5 + wetness;

    for i in 0..len {
        let t = i as f32 / len as f32;
        let primary = (1.0 - t).max(0.0).powf(primary_exp);
        let secondary = (1.0 - 0.7 * t).max(0.0).powf(secondary_exp);
        let early = (50.0 * t).sin() * (-10.0 * t).exp() * 0.3;
        let late = (15.0 * t).sin() * (-3.0 * t).exp() * 0.2;

        let u: f32 = rng.gen_range(-1.0..=1.0);
        let u2: f32 = rng.gen_range(-1.0..=1.0);

        out.push((u * primary * 0.6 + u2 * secondary * 0.4 + early + late) * trim);
    }
    out
}

fn seed_from_entropy() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0x5eed)
}
