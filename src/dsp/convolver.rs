use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

/*
Direct convolution with a two-second impulse response is ~88k multiplies
per output sample, hopeless in a realtime callback. Uniformly partitioned
fast convolution brings it down to a handful of FFTs per block:

    1. split the impulse into K partitions of `partition` samples, each
       zero-padded to 2*partition and transformed once at build time
    2. per input block: pad, transform, store the spectrum in a ring of
       the K most recent input spectra
    3. multiply-accumulate input spectrum k blocks ago with impulse
       partition k, inverse transform the sum
    4. overlap-add: first half is this block's output, second half is
       carried into the next block

Latency is zero blocks (the first partition contributes immediately);
the only constraint is that every block fed in is exactly `partition`
frames, which the chain's fixed render quantum guarantees.
*/

/// Streaming partitioned convolution for one channel.
///
/// Allocates everything up front; `process_block` is allocation-free.
pub struct Convolver {
    partition: usize,
    fft: Arc<dyn Fft<f32>>,
    ifft: Arc<dyn Fft<f32>>,
    ir_spectra: Vec<Vec<Complex<f32>>>,
    input_spectra: Vec<Vec<Complex<f32>>>,
    ring_pos: usize,
    overlap: Vec<f32>,
    work: Vec<Complex<f32>>,
    acc: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl Convolver {
    /// Build a convolver for `impulse` with the given partition size.
    /// An empty impulse yields a silent convolver (all-zero output).
    pub fn new(impulse: &[f32], partition: usize) -> Self {
        let partition = partition.max(1);
        let fft_len = partition * 2;

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_len);
        let ifft = planner.plan_fft_inverse(fft_len);

        let scratch_len = fft
            .get_inplace_scratch_len()
            .max(ifft.get_inplace_scratch_len());
        let mut scratch = vec![Complex::default(); scratch_len];

        let partitions = impulse.chunks(partition).count().max(1);
        let mut ir_spectra = Vec::with_capacity(partitions);
        if impulse.is_empty() {
            ir_spectra.push(vec![Complex::default(); fft_len]);
        } else {
            for chunk in impulse.chunks(partition) {
                let mut spectrum = vec![Complex::default(); fft_len];
                for (bin, &s) in spectrum.iter_mut().zip(chunk.iter()) {
                    bin.re = s;
                }
                fft.process_with_scratch(&mut spectrum, &mut scratch);
                ir_spectra.push(spectrum);
            }
        }

        let input_spectra = vec![vec![Complex::default(); fft_len]; ir_spectra.len()];

        Self {
            partition,
            fft,
            ifft,
            ir_spectra,
            input_spectra,
            ring_pos: 0,
            overlap: vec![0.0; partition],
            work: vec![Complex::default(); fft_len],
            acc: vec![Complex::default(); fft_len],
            scratch,
        }
    }

    pub fn partition(&self) -> usize {
        self.partition
    }

    /// Reverb tail length in frames beyond the end of the dry signal.
    pub fn tail_frames(&self) -> usize {
        self.ir_spectra.len() * self.partition
    }

    /// Convolve one block. `input` and `output` must both be at most one
    /// partition long; a short final block is zero-padded internally.
    pub fn process_block(&mut self, input: &[f32], output: &mut [f32]) {
        debug_assert!(input.len() <= self.partition);
        debug_assert!(output.len() <= self.partition);

        // Newest input spectrum overwrites the oldest ring slot.
        let slot = &mut self.input_spectra[self.ring_pos];
        for bin in slot.iter_mut() {
            *bin = Complex::default();
        }
        for (bin, &s) in slot.iter_mut().zip(input.iter()) {
            bin.re = s;
        }
        self.fft.process_with_scratch(slot, &mut self.scratch);

        // Multiply-accumulate: input block (now - k) against partition k.
        for bin in self.acc.iter_mut() {
            *bin = Complex::default();
        }
        let k_parts = self.ir_spectra.len();
        for (k, ir) in self.ir_spectra.iter().enumerate() {
            let idx = (self.ring_pos + k_parts - k) % k_parts;
            let inp = &self.input_spectra[idx];
            for ((a, x), h) in self.acc.iter_mut().zip(inp.iter()).zip(ir.iter()) {
                *a += x * h;
            }
        }
        self.work.copy_from_slice(&self.acc);
        self.ifft
            .process_with_scratch(&mut self.work, &mut self.scratch);

        // Overlap-add, with rustfft's unnormalized inverse scaled back down.
        let scale = 1.0 / (self.partition as f32 * 2.0);
        for (i, out) in output.iter_mut().enumerate() {
            *out = self.work[i].re * scale + self.overlap[i];
        }
        for (i, carry) in self.overlap.iter_mut().enumerate() {
            *carry = self.work[self.partition + i].re * scale;
        }

        self.ring_pos = (self.ring_pos + 1) % k_parts;
    }

    pub fn reset(&mut self) {
        for slot in self.input_spectra.iter_mut() {
            for bin in slot.iter_mut() {
                *bin = Complex::default();
            }
        }
        self.overlap.fill(0.0);
        self.ring_pos = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn direct_convolve(signal: &[f32], impulse: &[f32]) -> Vec<f32> {
        let mut out = vec![0.0f32; signal.len() + impulse.len() - 1];
        for (i, &s) in signal.iter().enumerate() {
            for (j, &h) in impulse.iter().enumerate() {
                out[i + j] += s * h;
            }
        }
        out
    }

    fn stream(conv: &mut Convolver, signal: &[f32], total: usize) -> Vec<f32> {
        let p = conv.partition();
        let mut out = Vec::with_capacity(total);
        let mut fed = 0;
        while out.len() < total {
            let end = (fed + p).min(signal.len());
            let input: Vec<f32> = if fed < signal.len() {
                signal[fed..end].to_vec()
            } else {
                vec![]
            };
            fed = end;
            let mut block = vec![0.0f32; p];
            conv.process_block(&input, &mut block);
            out.extend_from_slice(&block);
        }
        out.truncate(total);
        out
    }

    #[test]
    fn unit_impulse_is_identity() {
        let impulse = [1.0f32];
        let mut conv = Convolver::new(&impulse, 64);
        let signal: Vec<f32> = (0..256).map(|i| (i as f32 * 0.1).sin()).collect();
        let out = stream(&mut conv, &signal, 256);
        for (a, b) in signal.iter().zip(out.iter()) {
            assert!((a - b).abs() < 1e-4, "identity convolution drifted");
        }
    }

    #[test]
    fn delayed_impulse_delays_signal() {
        let mut impulse = vec![0.0f32; 100];
        impulse[99] = 1.0;
        let mut conv = Convolver::new(&impulse, 64);
        let signal: Vec<f32> = (0..256).map(|i| (i as f32 * 0.1).sin()).collect();
        let out = stream(&mut conv, &signal, 356);
        for &s in &out[..99] {
            assert!(s.abs() < 1e-4, "leading silence leaked: {}", s);
        }
        for (a, b) in signal.iter().zip(out[99..].iter()) {
            assert!((a - b).abs() < 1e-4);
        }
    }

    #[test]
    fn matches_direct_convolution() {
        // Impulse deliberately not a multiple of the partition size.
        let impulse: Vec<f32> = (0..150).map(|i| ((i * 37) % 23) as f32 / 23.0 - 0.5).collect();
        let signal: Vec<f32> = (0..500).map(|i| ((i * 17) % 31) as f32 / 31.0 - 0.5).collect();
        let expected = direct_convolve(&signal, &impulse);

        let mut conv = Convolver::new(&impulse, 64);
        let out = stream(&mut conv, &signal, expected.len());
        for (i, (a, b)) in expected.iter().zip(out.iter()).enumerate() {
            assert!((a - b).abs() < 1e-3, "mismatch at {}: {} vs {}", i, a, b);
        }
    }

    #[test]
    fn streaming_is_deterministic() {
        let impulse: Vec<f32> = (0..200).map(|i| (i as f32 * 0.3).sin() * 0.1).collect();
        let signal: Vec<f32> = (0..512).map(|i| (i as f32 * 0.05).cos()).collect();

        let mut a = Convolver::new(&impulse, 128);
        let mut b = Convolver::new(&impulse, 128);
        assert_eq!(stream(&mut a, &signal, 700), stream(&mut b, &signal, 700));
    }

    #[test]
    fn reset_clears_tail() {
        let impulse = vec![0.5f32; 256];
        let mut conv = Convolver::new(&impulse, 64);
        let mut block = vec![0.0f32; 64];
        conv.process_block(&vec![1.0f32; 64], &mut block);
        conv.reset();
        conv.process_block(&vec![0.0f32; 64], &mut block);
        assert!(block.iter().all(|&s| s.abs() < 1e-6));
    }

    #[test]
    fn empty_impulse_is_silent() {
        let mut conv = Convolver::new(&[], 64);
        let mut block = vec![0.0f32; 64];
        conv.process_block(&vec![1.0f32; 64], &mut block);
        assert!(block.iter().all(|&s| s == 0.0));
    }
}
