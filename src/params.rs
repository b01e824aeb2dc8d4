//! Effect parameter snapshots.
//!
//! The UI layer produces a fresh immutable snapshot for every change; the
//! engine never mutates one. Slider-facing fields are normalized to [0, 1]
//! and converted to engine units by [`crate::mapping`]; the advanced fields
//! carry engine units directly.

use crate::error::EngineError;
use crate::mapping;

/// One immutable set of user-facing effect controls.
///
/// The five EQ bands are optional: absence means "use the 0.5 identity
/// default", not "disabled". The limiter and attenuator gates are explicit
/// booleans and additionally require `processing_enabled`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EffectParameters {
    /// Volume slider, 0..=1, mapped through a perceptual gain curve.
    pub volume: f32,
    /// Bass boost slider, 0..=1, mapped to a shelf pair.
    pub bass_boost: f32,
    /// Playback rate, clamped to 0.25..=2.0.
    pub tempo: f32,
    /// Reverb amount, 0..=1. Doubles as the impulse wetness control.
    pub reverb: f32,

    pub eq_low: Option<f32>,
    pub eq_low_mid: Option<f32>,
    pub eq_mid: Option<f32>,
    pub eq_high_mid: Option<f32>,
    pub eq_high: Option<f32>,

    pub limiter_enabled: bool,
    /// Limiter threshold in dBFS, -60..=0.
    pub limiter_threshold_db: f32,
    /// Limiter release in seconds, 0.01..=1.
    pub limiter_release_sec: f32,

    pub attenuator_enabled: bool,
    /// Attenuator make-up gain in dB, 0..=20.
    pub attenuator_gain_db: f32,

    /// Master gate for the limiter/attenuator pair.
    pub processing_enabled: bool,
}

impl Default for EffectParameters {
    fn default() -> Self {
        Self {
            volume: 1.0,
            bass_boost: 0.0,
            tempo: 1.0,
            reverb: 0.0,
            eq_low: None,
            eq_low_mid: None,
            eq_mid: None,
            eq_high_mid: None,
            eq_high: None,
            limiter_enabled: false,
            limiter_threshold_db: -1.0,
            limiter_release_sec: 0.1,
            attenuator_enabled: false,
            attenuator_gain_db: 10.0,
            processing_enabled: true,
        }
    }
}

impl EffectParameters {
    /// The five EQ bands in chain order, with absent bands at the identity.
    pub fn eq_bands(&self) -> [f32; 5] {
        [
            self.eq_low.unwrap_or(0.5),
            self.eq_low_mid.unwrap_or(0.5),
            self.eq_mid.unwrap_or(0.5),
            self.eq_high_mid.unwrap_or(0.5),
            self.eq_high.unwrap_or(0.5),
        ]
    }

    /// True when any EQ band was given explicitly.
    pub fn has_eq(&self) -> bool {
        self.eq_low.is_some()
            || self.eq_low_mid.is_some()
            || self.eq_mid.is_some()
            || self.eq_high_mid.is_some()
            || self.eq_high.is_some()
    }

    pub fn limiter_active(&self) -> bool {
        self.limiter_enabled && self.processing_enabled
    }

    pub fn attenuator_active(&self) -> bool {
        self.attenuator_enabled && self.processing_enabled
    }

    /// A clamped copy of this snapshot.
    ///
    /// Out-of-range values are clamped rather than rejected; only non-finite
    /// values have no sane clamp and produce `InvalidParameter`.
    pub fn sanitized(&self) -> Result<Self, EngineError> {
        fn check(name: &'static str, value: f32) -> Result<f32, EngineError> {
            if value.is_finite() {
                Ok(value)
            } else {
                Err(EngineError::InvalidParameter { name, value })
            }
        }

        let mut out = self.clone();
        out.volume = check("volume", self.volume)?.clamp(0.0, 1.0);
        out.bass_boost = check("bass_boost", self.bass_boost)?.clamp(0.0, 1.0);
        out.tempo = mapping::clamp_tempo(check("tempo", self.tempo)?);
        out.reverb = check("reverb", self.reverb)?.clamp(0.0, 1.0);

        for (name, band) in [
            ("eq_low", &mut out.eq_low),
            ("eq_low_mid", &mut out.eq_low_mid),
            ("eq_mid", &mut out.eq_mid),
            ("eq_high_mid", &mut out.eq_high_mid),
            ("eq_high", &mut out.eq_high),
        ] {
            if let Some(v) = *band {
                *band = Some(check(name, v)?.clamp(0.0, 1.0));
            }
        }

        out.limiter_threshold_db =
            check("limiter_threshold_db", self.limiter_threshold_db)?.clamp(-60.0, 0.0);
        out.limiter_release_sec =
            check("limiter_release_sec", self.limiter_release_sec)?.clamp(0.01, 1.0);
        out.attenuator_gain_db =
            check("attenuator_gain_db", self.attenuator_gain_db)?.clamp(0.0, 20.0);

        Ok(out)
    }
}
