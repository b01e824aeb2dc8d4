//! Slider-to-engine unit conversions.
//!
//! Pure, referentially transparent functions; no state, no I/O. Every
//! UI-facing control is a normalized value in [0, 1] (or a boolean); these
//! functions convert to engine-native units: linear gain, dB, Hz, seconds.
//! Both the live chain and the offline renderer go through this one module,
//! which is what guarantees preview/export parity.

/*
Why a piecewise volume curve?
-----------------------------

Human loudness perception is logarithmic: the step from gain 0.1 to 0.2
sounds like the step from 0.4 to 0.8. A slider wired linearly to gain feels
dead over most of its travel. The curve below is exponential in both halves,
so equal slider movements give roughly equal loudness steps, and the top of
the range is capped just under +6 dB of boost so exports cannot clip from
the volume control alone:

    v = 0.0          -> 0 (hard silence, exact)
    0 < v <= 0.5     -> 10^((2v - 1) * 3) / 10      quiet range
    0.5 < v <= 1.0   -> 10^((v - 0.5) * 2.4) / 10   boost range

The two branches meet at v = 0.5 (both give 0.1) so the curve is continuous
and monotone; the result is clamped to [0, 2] as a final guard.
*/

/// Convert the volume slider to linear gain. Monotone, 0 at 0, in [0, 2].
pub fn volume_to_linear_gain(v: f32) -> f32 {
    let v = v.clamp(0.0, 1.0);
    if v == 0.0 {
        return 0.0;
    }
    let gain = if v <= 0.5 {
        10.0f32.powf((v * 2.0 - 1.0) * 3.0) / 10.0
    } else {
        10.0f32.powf((v - 0.5) * 2.4) / 10.0
    };
    gain.clamp(0.0, 2.0)
}

/// Center frequency of the bass-boost low shelf.
pub const BASS_SHELF_HZ: f32 = 120.0;
/// Q for both bass-boost shelves.
pub const BASS_SHELF_Q: f32 = 0.7;
/// Center frequency of the complementary high shelf.
pub const BASS_COMPLEMENT_HZ: f32 = 8_000.0;

/// Convert the bass-boost slider to low-shelf gain in dB (0..=15).
///
/// Gentle up to the midpoint (0..6 dB), steeper above it (6..15 dB).
pub fn bass_boost_to_shelf_gain_db(b: f32) -> f32 {
    let b = b.clamp(0.0, 1.0);
    if b <= 0.5 {
        b * 12.0
    } else {
        6.0 + (b - 0.5) * 18.0
    }
}

/// Complementary high-shelf gain (0..=2.1 dB) that offsets the muddiness a
/// strong low shelf introduces.
pub fn bass_boost_to_complement_gain_db(b: f32) -> f32 {
    (b.clamp(0.0, 1.0) - 0.3).max(0.0) * 3.0
}

/// Convert an EQ band slider to dB. 0.5 is the exact identity point.
pub fn eq_slider_to_db(s: f32) -> f32 {
    (s - 0.5) * 40.0
}

/// dB to linear amplitude.
pub fn db_to_linear(db: f32) -> f32 {
    10.0f32.powf(db / 20.0)
}

/// Attenuator make-up gain, dB to linear.
pub fn attenuator_db_to_linear(db: f32) -> f32 {
    db_to_linear(db)
}

/// Clamp tempo/playback-rate into the supported range. Out-of-range values
/// are clamped, never rejected.
pub fn clamp_tempo(tempo: f32) -> f32 {
    tempo.clamp(0.25, 2.0)
}

/// Wet-path gain multiplier for the reverb mix (the reference mix).
pub const REVERB_WET_MULTIPLIER: f32 = 1.5;
