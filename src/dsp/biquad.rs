use std::f32::consts::TAU;

/*
All three responses come from the RBJ "Audio EQ Cookbook" with
A = 10^(gain_db / 40) and alpha = sin(w0) / (2 Q):

| response   | used for                                |
| ---------- | --------------------------------------- |
| peaking    | the five graphic-EQ bands               |
| low shelf  | bass boost body (120 Hz)                |
| high shelf | bass boost clarity complement (8 kHz)   |

Every response is an identity filter at gain_db = 0 (all bands at the
slider midpoint leave the signal untouched, bit for bit is not promised
but the coefficients collapse to b = [1, a1, a2]).
*/

/// Normalized direct-form-I coefficients (a0 already divided out).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadCoeffs {
    pub b0: f32,
    pub b1: f32,
    pub b2: f32,
    pub a1: f32,
    pub a2: f32,
}

impl BiquadCoeffs {
    /// Coefficients that pass the signal unchanged.
    pub fn identity() -> Self {
        Self {
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
        }
    }

    pub fn peaking(sample_rate: f32, freq_hz: f32, q: f32, gain_db: f32) -> Self {
        let a = 10.0f32.powf(gain_db / 40.0);
        let w0 = TAU * (freq_hz / sample_rate).min(0.499);
        let (sin_w0, cos_w0) = w0.sin_cos();
        let alpha = sin_w0 / (2.0 * q);

        let a0 = 1.0 + alpha / a;
        Self {
            b0: (1.0 + alpha * a) / a0,
            b1: (-2.0 * cos_w0) / a0,
            b2: (1.0 - alpha * a) / a0,
            a1: (-2.0 * cos_w0) / a0,
            a2: (1.0 - alpha / a) / a0,
        }
    }

    pub fn low_shelf(sample_rate: f32, freq_hz: f32, q: f32, gain_db: f32) -> Self {
        let a = 10.0f32.powf(gain_db / 40.0);
        let w0 = TAU * (freq_hz / sample_rate).min(0.499);
        let (sin_w0, cos_w0) = w0.sin_cos();
        let alpha = sin_w0 / (2.0 * q);
        let two_sqrt_a_alpha = 2.0 * a.sqrt() * alpha;

        let a0 = (a + 1.0) + (a - 1.0) * cos_w0 + two_sqrt_a_alpha;
        Self {
            b0: a * ((a + 1.0) - (a - 1.0) * cos_w0 + two_sqrt_a_alpha) / a0,
            b1: 2.0 * a * ((a - 1.0) - (a + 1.0) * cos_w0) / a0,
            b2: a * ((a + 1.0) - (a - 1.0) * cos_w0 - two_sqrt_a_alpha) / a0,
            a1: -2.0 * ((a - 1.0) + (a + 1.0) * cos_w0) / a0,
            a2: ((a + 1.0) + (a - 1.0) * cos_w0 - two_sqrt_a_alpha) / a0,
        }
    }

    pub fn high_shelf(sample_rate: f32, freq_hz: f32, q: f32, gain_db: f32) -> Self {
        let a = 10.0f32.powf(gain_db / 40.0);
        let w0 = TAU * (freq_hz / sample_rate).min(0.499);
        let (sin_w0, cos_w0) = w0.sin_cos();
        let alpha = sin_w0 / (2.0 * q);
        let two_sqrt_a_alpha = 2.0 * a.sqrt() * alpha;

        let a0 = (a + 1.0) - (a - 1.0) * cos_w0 + two_sqrt_a_alpha;
        Self {
            b0: a * ((a + 1.0) + (a - 1.0) * cos_w0 + two_sqrt_a_alpha) / a0,
            b1: -2.0 * a * ((a - 1.0) + (a + 1.0) * cos_w0) / a0,
            b2: a * ((a + 1.0) + (a - 1.0) * cos_w0 - two_sqrt_a_alpha) / a0,
            a1: 2.0 * ((a - 1.0) - (a + 1.0) * cos_w0) / a0,
            a2: ((a + 1.0) - (a - 1.0) * cos_w0 - two_sqrt_a_alpha) / a0,
        }
    }
}

/// One biquad section with direct-form-I state for a single channel.
pub struct Biquad {
    coeffs: BiquadCoeffs,
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

impl Biquad {
    pub fn new(coeffs: BiquadCoeffs) -> Self {
        Self {
            coeffs,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        }
    }

    /// Swap in new coefficients without resetting the delay state, so a
    /// slider move mid-playback does not click.
    pub fn retune(&mut self, coeffs: BiquadCoeffs) {
        self.coeffs = coeffs;
    }

    pub fn coeffs(&self) -> BiquadCoeffs {
        self.coeffs
    }

    pub fn reset(&mut self) {
        self.x1 = 0.0;
        self.x2 = 0.0;
        self.y1 = 0.0;
        self.y2 = 0.0;
    }

    #[inline]
    pub fn next_sample(&mut self, x: f32) -> f32 {
        let c = &self.coeffs;
        let y = c.b0 * x + c.b1 * self.x1 + c.b2 * self.x2 - c.a1 * self.y1 - c.a2 * self.y2;
        self.x2 = self.x1;
        self.x1 = x;
        self.y2 = self.y1;
        self.y1 = y;
        y
    }

    pub fn render(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.next_sample(*sample);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::TAU;

    fn sine(sample_rate: f32, freq: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (TAU * freq * i as f32 / sample_rate).sin())
            .collect()
    }

    fn rms(buf: &[f32]) -> f32 {
        (buf.iter().map(|s| s * s).sum::<f32>() / buf.len() as f32).sqrt()
    }

    #[test]
    fn zero_gain_is_identity() {
        for coeffs in [
            BiquadCoeffs::peaking(44_100.0, 1_000.0, 1.0, 0.0),
            BiquadCoeffs::low_shelf(44_100.0, 120.0, 0.7, 0.0),
            BiquadCoeffs::high_shelf(44_100.0, 8_000.0, 0.7, 0.0),
        ] {
            let mut filter = Biquad::new(coeffs);
            let input = sine(44_100.0, 440.0, 1_024);
            let mut output = input.clone();
            filter.render(&mut output);
            for (a, b) in input.iter().zip(output.iter()) {
                assert!((a - b).abs() < 1e-4, "identity filter altered signal");
            }
        }
    }

    #[test]
    fn peaking_boosts_center_frequency() {
        let sample_rate = 44_100.0;
        let mut filter = Biquad::new(BiquadCoeffs::peaking(sample_rate, 1_000.0, 1.0, 12.0));
        let mut at_center = sine(sample_rate, 1_000.0, 8_192);
        filter.render(&mut at_center);

        filter = Biquad::new(BiquadCoeffs::peaking(sample_rate, 1_000.0, 1.0, 12.0));
        let mut far_off = sine(sample_rate, 10_000.0, 8_192);
        filter.render(&mut far_off);

        let center = rms(&at_center[1_024..]);
        let off = rms(&far_off[1_024..]);
        assert!(
            center > off * 2.0,
            "expected boost at center, got center={} off={}",
            center,
            off
        );
    }

    #[test]
    fn low_shelf_boosts_bass_not_treble() {
        let sample_rate = 44_100.0;
        let coeffs = BiquadCoeffs::low_shelf(sample_rate, 120.0, 0.7, 12.0);

        let mut filter = Biquad::new(coeffs);
        let mut bass = sine(sample_rate, 60.0, 16_384);
        filter.render(&mut bass);

        let mut filter = Biquad::new(coeffs);
        let mut treble = sine(sample_rate, 5_000.0, 16_384);
        filter.render(&mut treble);

        let bass_rms = rms(&bass[2_048..]);
        let treble_rms = rms(&treble[2_048..]);
        // 12 dB shelf: bass roughly 4x, treble unchanged (~0.707).
        assert!(bass_rms > 2.0, "bass rms {}", bass_rms);
        assert!(treble_rms < 0.9, "treble rms {}", treble_rms);
    }

    #[test]
    fn negative_gain_attenuates() {
        let sample_rate = 44_100.0;
        let mut filter = Biquad::new(BiquadCoeffs::peaking(sample_rate, 1_000.0, 1.0, -20.0));
        let mut buf = sine(sample_rate, 1_000.0, 8_192);
        filter.render(&mut buf);
        assert!(rms(&buf[1_024..]) < 0.2);
    }

    #[test]
    fn retune_keeps_delay_state() {
        let mut filter = Biquad::new(BiquadCoeffs::peaking(44_100.0, 1_000.0, 1.0, 6.0));
        let mut buf = sine(44_100.0, 440.0, 256);
        filter.render(&mut buf);
        let before = (filter.x1, filter.y1);

        filter.retune(BiquadCoeffs::peaking(44_100.0, 1_000.0, 1.0, 9.0));
        assert_eq!((filter.x1, filter.y1), before);
    }

    #[test]
    fn frequency_above_nyquist_is_clamped_stable() {
        let mut filter = Biquad::new(BiquadCoeffs::peaking(8_000.0, 16_000.0, 1.0, 6.0));
        let mut buf = sine(8_000.0, 1_000.0, 4_096);
        filter.render(&mut buf);
        assert!(buf.iter().all(|s| s.is_finite()));
    }
}
