//! Deterministic offline rendering.
//!
//! The offline path pulls the same fixed-size blocks through the same chain
//! the live path uses, so an export is sample-for-sample the signal the
//! preview played. Renders are pure functions of (source, parameters): the
//! reverb impulse seed is derived from the parameters, not from entropy.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::buffer::SampleBuffer;
use crate::error::EngineError;
use crate::graph::builder;
use crate::params::EffectParameters;

/// Cooperative cancellation for an in-flight render.
///
/// Cloning shares the flag: the scheduler keeps one handle and hands the
/// other to the render, then cancels when a newer snapshot supersedes it.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// Render `source` through the full chain and return the processed buffer.
///
/// The output holds `floor(source frames / tempo)` frames: tempo above 1.0
/// shortens the result, below 1.0 lengthens it. Sample values are not
/// clamped here; call [`SampleBuffer::clamped`] before handing the result
/// to a 16-bit encoder.
pub fn render(
    source: Arc<SampleBuffer>,
    params: &EffectParameters,
) -> Result<SampleBuffer, EngineError> {
    render_cancellable(source, params, &CancelToken::new())
}

/// [`render`], checking `cancel` between blocks.
///
/// Returns [`EngineError::RenderCancelled`] when superseded; the partial
/// output is discarded.
pub fn render_cancellable(
    source: Arc<SampleBuffer>,
    params: &EffectParameters,
    cancel: &CancelToken,
) -> Result<SampleBuffer, EngineError> {
    let sanitized = params.sanitized()?;
    let mut chain = builder::build_chain(source.clone(), &sanitized, 0.0)?;

    let target_frames = output_frame_count(source.frame_count(), sanitized.tempo);
    let channel_count = chain.channel_count();
    let mut output: Vec<Vec<f32>> = vec![Vec::with_capacity(target_frames); channel_count];

    let mut rendered = 0;
    while rendered < target_frames {
        if cancel.is_cancelled() {
            return Err(EngineError::RenderCancelled);
        }
        let block = chain.next_quantum();
        let take = (target_frames - rendered).min(block[0].len());
        for (out, ch) in output.iter_mut().zip(block.iter()) {
            out.extend_from_slice(&ch[..take]);
        }
        rendered += take;
    }

    SampleBuffer::new(output, source.sample_rate())
}

/// Output length for a source rendered at `tempo`.
///
/// The tempo arrives as f32, and widening it to f64 perturbs values like
/// 0.8 upward by half an f32 ulp. That would pull a mathematically exact
/// quotient (220_500 / 0.8 = 275_625) just below its integer and lose a
/// frame to the floor, so the quotient is nudged by a relative epsilon
/// far larger than the widening error and far smaller than one frame.
fn output_frame_count(source_frames: usize, tempo: f32) -> usize {
    let quotient = source_frames as f64 / tempo as f64;
    (quotient + quotient * 1e-9).floor() as usize
}

/// Run [`render_cancellable`] on a worker thread. The export path uses
/// this so a long render never stalls the control thread.
pub fn spawn_render(
    source: Arc<SampleBuffer>,
    params: EffectParameters,
    cancel: CancelToken,
) -> std::thread::JoinHandle<Result<SampleBuffer, EngineError>> {
    std::thread::spawn(move || render_cancellable(source, &params, &cancel))
}
