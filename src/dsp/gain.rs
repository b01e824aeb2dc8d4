//! Scalar gain application.

/// Multiply every sample by `gain` in place.
#[inline]
pub fn apply_gain(buffer: &mut [f32], gain: f32) {
    if gain == 1.0 {
        return;
    }
    for sample in buffer.iter_mut() {
        *sample *= gain;
    }
}
