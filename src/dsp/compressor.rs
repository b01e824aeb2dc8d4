use crate::mapping::db_to_linear;

/*
Limiter = compressor with a high ratio and an instant-ish attack. Signal
level is tracked by a one-pole envelope follower:

    env += coef * (|x| - env)     coef = attack while rising, release while falling

While the envelope sits above the threshold, gain is reduced so the output
level follows threshold * (env / threshold)^(1/ratio); at ratio 20 the
curve above the threshold is nearly flat. A final hard clamp at the
threshold catches the attack-time overshoot on transients.
*/

/// Fixed limiting ratio. High enough to act as a ceiling, low enough to
/// avoid the pumping a hard 1:inf brick wall produces.
pub const LIMITER_RATIO: f32 = 20.0;
/// Envelope attack time.
pub const LIMITER_ATTACK_SEC: f32 = 0.001;

/// Peak limiter for one channel.
pub struct Limiter {
    threshold: f32,
    attack_coef: f32,
    release_coef: f32,
    envelope: f32,
}

impl Limiter {
    pub fn new(sample_rate: f32, threshold_db: f32, release_sec: f32) -> Self {
        let mut limiter = Self {
            threshold: db_to_linear(threshold_db),
            attack_coef: 0.0,
            release_coef: 0.0,
            envelope: 0.0,
        };
        limiter.set_times(sample_rate, release_sec);
        limiter
    }

    /// Retune without resetting the envelope, so mid-playback changes do
    /// not produce a gain jump.
    pub fn retune(&mut self, sample_rate: f32, threshold_db: f32, release_sec: f32) {
        self.threshold = db_to_linear(threshold_db);
        self.set_times(sample_rate, release_sec);
    }

    fn set_times(&mut self, sample_rate: f32, release_sec: f32) {
        self.attack_coef = time_coef(sample_rate, LIMITER_ATTACK_SEC);
        self.release_coef = time_coef(sample_rate, release_sec.max(0.001));
    }

    pub fn reset(&mut self) {
        self.envelope = 0.0;
    }

    #[inline]
    pub fn next_sample(&mut self, x: f32) -> f32 {
        let level = x.abs();
        let coef = if level > self.envelope {
            self.attack_coef
        } else {
            self.release_coef
        };
        self.envelope += coef * (level - self.envelope);

        let mut out = x;
        if self.envelope > self.threshold {
            let excess = self.envelope / self.threshold;
            let target = self.threshold * excess.powf(1.0 / LIMITER_RATIO);
            out = x * (target / self.envelope);
        }
        out.clamp(-self.threshold, self.threshold)
    }

    pub fn render(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.next_sample(*sample);
        }
    }
}

#[inline]
fn time_coef(sample_rate: f32, time_sec: f32) -> f32 {
    1.0 - (-1.0 / (time_sec * sample_rate)).exp()
}
