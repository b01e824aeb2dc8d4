//! Live playback over a cpal output stream.
//!
//! The audio callback owns the [`EffectChain`] outright; nothing else ever
//! touches it. Control arrives along two lanes:
//!
//! - scalar parameter changes go through a shared snapshot guarded by a
//!   generation counter; the callback picks them up with a `try_lock` and
//!   applies them in place (no allocation, no click)
//! - structural changes (a seek's replacement player, a new reverb impulse)
//!   are built on the control thread and moved through a wait-free rtrb
//!   ring, so the callback only ever does a pointer swap
//!
//! Progress flows the other way as plain atomics: the position cursor and a
//! latched end-of-signal flag the caller consumes exactly once. Displaced
//! reverb stages travel back over a second ring and are freed on the
//! control thread; the callback neither allocates nor deallocates.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use rtrb::RingBuffer;

use crate::buffer::SampleBuffer;
use crate::dsp::player::SamplePlayer;
use crate::engine::transport::{self, TransportCommand, TransportState};
use crate::error::EngineError;
use crate::graph::builder;
use crate::graph::stage::ReverbStage;
use crate::mapping;
use crate::params::EffectParameters;

/// Structural commands queued toward the audio callback. Each one carries a
/// fully built replacement; the callback never constructs anything.
enum LiveCommand {
    SwapSource(SamplePlayer),
    ReplaceReverb(ReverbStage),
}

/// Seeks and impulse swaps outstanding at once. Commands are consumed every
/// callback, so this only needs to absorb a short burst.
const COMMAND_CAPACITY: usize = 8;

struct SharedState {
    generation: AtomicU64,
    params: Mutex<EffectParameters>,
    position_bits: AtomicU64,
    ended: AtomicBool,
}

/// A new impulse is needed when the reverb amount itself changed (the
/// impulse shape depends on it), not when only the mix would move.
fn needs_new_impulse(old: &EffectParameters, new: &EffectParameters) -> bool {
    new.reverb > 0.0 && old.reverb.to_bits() != new.reverb.to_bits()
}

/// Raise the end-of-signal flag on the false-to-true edge only. The chain
/// keeps reporting finished while the stream winds down, and re-latching
/// every block would hand the caller a second completion for the same pass.
fn latch_ended(finished: bool, was_finished: &mut bool, ended: &AtomicBool) {
    if finished && !*was_finished {
        ended.store(true, Ordering::Release);
    }
    *was_finished = finished;
}

/// The audio output resource: one per session, shared by every controller
/// the session creates instead of each reaching for a process global.
pub struct AudioEngine {
    device: cpal::Device,
}

impl AudioEngine {
    /// Acquire the default output device. Recoverable failure: on most
    /// platforms this succeeds after a user gesture even when it failed at
    /// startup, so callers may retry.
    pub fn new() -> Result<Self, EngineError> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or_else(|| {
            EngineError::PlaybackUnavailable("no default output device".into())
        })?;
        Ok(Self { device })
    }
}

/// One playback session: a device stream bound to one loaded source.
///
/// Not `Send` (it owns the cpal stream); it lives on the thread that
/// created it, typically the UI thread.
pub struct PlaybackController {
    source: Arc<SampleBuffer>,
    shared: Arc<SharedState>,
    commands: rtrb::Producer<LiveCommand>,
    discards: rtrb::Consumer<ReverbStage>,
    stream: cpal::Stream,
    state: TransportState,
    current: EffectParameters,
}

impl PlaybackController {
    /// Convenience constructor acquiring a fresh [`AudioEngine`].
    pub fn new(
        source: Arc<SampleBuffer>,
        params: &EffectParameters,
    ) -> Result<Self, EngineError> {
        Self::with_engine(&AudioEngine::new()?, source, params)
    }

    /// Wire the chain into `engine`'s output device. The stream starts
    /// paused; call [`PlaybackController::play`].
    pub fn with_engine(
        engine: &AudioEngine,
        source: Arc<SampleBuffer>,
        params: &EffectParameters,
    ) -> Result<Self, EngineError> {
        let sanitized = params.sanitized()?;
        let mut chain = builder::build_chain(source.clone(), &sanitized, 0.0)?;
        let device = &engine.device;

        let config = cpal::StreamConfig {
            channels: chain.channel_count() as u16,
            sample_rate: cpal::SampleRate(chain.sample_rate()),
            buffer_size: cpal::BufferSize::Default,
        };

        let (producer, mut consumer) = RingBuffer::<LiveCommand>::new(COMMAND_CAPACITY);
        let (mut discard_producer, discard_consumer) =
            RingBuffer::<ReverbStage>::new(COMMAND_CAPACITY);
        let shared = Arc::new(SharedState {
            generation: AtomicU64::new(0),
            params: Mutex::new(sanitized.clone()),
            position_bits: AtomicU64::new(0f64.to_bits()),
            ended: AtomicBool::new(false),
        });

        let callback_shared = shared.clone();
        let mut last_generation = 0u64;
        let mut was_finished = false;
        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _| {
                    while let Ok(command) = consumer.pop() {
                        match command {
                            LiveCommand::SwapSource(player) => chain.begin_source_swap(player),
                            LiveCommand::ReplaceReverb(reverb) => {
                                let displaced = chain.replace_reverb(reverb);
                                // Freed on the control thread, which drains
                                // this lane before queueing the next swap.
                                let _ = discard_producer.push(displaced);
                            }
                        }
                    }

                    let generation = callback_shared.generation.load(Ordering::Acquire);
                    if generation != last_generation {
                        // try_lock: if the control thread holds it right
                        // now we pick the snapshot up next callback.
                        if let Ok(snapshot) = callback_shared.params.try_lock() {
                            chain.apply_params(&snapshot);
                            last_generation = generation;
                        }
                    }

                    chain.fill_interleaved(data);

                    callback_shared
                        .position_bits
                        .store(chain.position_seconds().to_bits(), Ordering::Release);
                    latch_ended(chain.finished(), &mut was_finished, &callback_shared.ended);
                },
                |err| eprintln!("audio stream error: {}", err),
                None,
            )
            .map_err(|e| EngineError::PlaybackUnavailable(e.to_string()))?;

        stream
            .pause()
            .map_err(|e| EngineError::PlaybackUnavailable(e.to_string()))?;

        Ok(Self {
            source,
            shared,
            commands: producer,
            discards: discard_consumer,
            stream,
            state: TransportState::Stopped,
            current: sanitized,
        })
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == TransportState::Playing
    }

    pub fn play(&mut self) -> Result<(), EngineError> {
        self.transition(TransportCommand::Play)
    }

    pub fn pause(&mut self) -> Result<(), EngineError> {
        self.transition(TransportCommand::Pause)
    }

    pub fn resume(&mut self) -> Result<(), EngineError> {
        self.transition(TransportCommand::Resume)
    }

    /// Stop and rewind to the start of the source.
    pub fn stop(&mut self) -> Result<(), EngineError> {
        self.transition(TransportCommand::Stop)?;
        self.push_seek(0.0)
    }

    fn transition(&mut self, command: TransportCommand) -> Result<(), EngineError> {
        let Some(next) = transport::apply(self.state, command) else {
            // Stale command, dropped.
            return Ok(());
        };
        match next {
            TransportState::Playing => self.stream.play(),
            TransportState::Paused | TransportState::Stopped => self.stream.pause(),
        }
        .map_err(|e| EngineError::PlaybackUnavailable(e.to_string()))?;
        self.state = next;
        Ok(())
    }

    /// Jump to `seconds` into the source. The replacement player is built
    /// here and crossfaded in by the callback.
    pub fn seek(&mut self, seconds: f64) -> Result<(), EngineError> {
        self.push_seek(seconds)
    }

    fn push_seek(&mut self, seconds: f64) -> Result<(), EngineError> {
        let seconds = seconds.clamp(0.0, self.source.duration_seconds());
        let player = SamplePlayer::with_start(
            self.source.clone(),
            mapping::clamp_tempo(self.current.tempo),
            seconds,
        );
        self.commands
            .push(LiveCommand::SwapSource(player))
            .map_err(|_| EngineError::PlaybackUnavailable("command queue full".into()))?;
        // Reflect the target immediately; while paused the callback that
        // would otherwise publish it is not running.
        self.shared
            .position_bits
            .store(seconds.to_bits(), Ordering::Release);
        Ok(())
    }

    /// Publish a new parameter snapshot to the running chain.
    ///
    /// Scalar changes land within one render quantum. A changed reverb
    /// amount additionally synthesizes a new impulse here, off the audio
    /// thread, and ships the rebuilt convolvers over.
    pub fn set_params(&mut self, params: &EffectParameters) -> Result<(), EngineError> {
        let sanitized = params.sanitized()?;
        self.drain_discards();

        if needs_new_impulse(&self.current, &sanitized) {
            let reverb = builder::build_reverb_stage(
                self.source.sample_rate(),
                self.source.channel_count(),
                crate::RENDER_QUANTUM,
                sanitized.reverb,
            );
            self.commands
                .push(LiveCommand::ReplaceReverb(reverb))
                .map_err(|_| EngineError::PlaybackUnavailable("command queue full".into()))?;
        }

        {
            let mut slot = self
                .shared
                .params
                .lock()
                .map_err(|_| EngineError::PlaybackUnavailable("engine state poisoned".into()))?;
            *slot = sanitized.clone();
        }
        self.shared.generation.fetch_add(1, Ordering::Release);
        self.current = sanitized;
        Ok(())
    }

    /// Playback position in seconds, as of the last completed callback.
    pub fn position_seconds(&self) -> f64 {
        f64::from_bits(self.shared.position_bits.load(Ordering::Acquire))
    }

    pub fn duration_seconds(&self) -> f64 {
        self.source.duration_seconds()
    }

    /// True exactly once after the signal (source plus reverb tail) runs
    /// out; also moves the transport to `Stopped` and rewinds the cursor,
    /// so the next `play` starts from the top.
    pub fn take_finished(&mut self) -> bool {
        self.drain_discards();
        let ended = self.shared.ended.swap(false, Ordering::AcqRel);
        if ended {
            if let Some(next) = transport::apply(self.state, TransportCommand::SourceEnded) {
                self.state = next;
                let _ = self.stream.pause();
            }
            let _ = self.push_seek(0.0);
        }
        ended
    }

    /// Free reverb stages the callback displaced. Popping drops them here,
    /// on the control thread, where freeing megabytes of spectra is fine.
    fn drain_discards(&mut self) {
        while self.discards.pop().is_ok() {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn impulse_rebuild_follows_the_reverb_amount() {
        let old = EffectParameters::default();
        let wet = EffectParameters {
            reverb: 0.5,
            ..Default::default()
        };
        let wetter = EffectParameters {
            reverb: 0.8,
            ..Default::default()
        };

        assert!(needs_new_impulse(&old, &wet), "enabling reverb needs an impulse");
        assert!(needs_new_impulse(&wet, &wetter), "wetness change reshapes the impulse");
        assert!(!needs_new_impulse(&wet, &wet), "unchanged amount keeps the impulse");
        assert!(
            !needs_new_impulse(&wet, &old),
            "disabling reverb is a mix change only"
        );
    }

    #[test]
    fn completion_latches_once_per_pass() {
        let ended = AtomicBool::new(false);
        let mut was_finished = false;

        latch_ended(false, &mut was_finished, &ended);
        assert!(!ended.swap(false, Ordering::AcqRel));

        latch_ended(true, &mut was_finished, &ended);
        assert!(ended.swap(false, Ordering::AcqRel), "edge raises the flag");

        // The stream keeps calling back while it winds down; the flag must
        // not come back for the same pass.
        latch_ended(true, &mut was_finished, &ended);
        latch_ended(true, &mut was_finished, &ended);
        assert!(!ended.swap(false, Ordering::AcqRel));

        // A rewind makes the chain unfinished again; the next run-out is a
        // new completion.
        latch_ended(false, &mut was_finished, &ended);
        latch_ended(true, &mut was_finished, &ended);
        assert!(ended.swap(false, Ordering::AcqRel));
    }
}
