//! Debounced fan-out of parameter changes.
//!
//! A slider drag produces dozens of snapshots per second. Applying each one
//! to the live chain is cheap but rebuilding the offline preview is not, so
//! the two sinks get different debounce windows: the live chain follows
//! after a short quiet period, the offline refresh after a longer one. Only
//! the latest snapshot is ever delivered; intermediate drags are dropped.

use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::params::EffectParameters;

/// Debounce windows. The defaults track a comfortable slider drag; tests
/// inject millisecond-scale windows instead.
#[derive(Debug, Clone, Copy)]
pub struct DebounceWindows {
    pub live_apply: Duration,
    pub offline_refresh: Duration,
}

impl Default for DebounceWindows {
    fn default() -> Self {
        Self {
            live_apply: Duration::from_millis(100),
            offline_refresh: Duration::from_millis(500),
        }
    }
}

/// Owns the debounce thread. Dropping the scheduler drains it.
pub struct EffectUpdateScheduler {
    tx: Option<mpsc::Sender<EffectParameters>>,
    handle: Option<JoinHandle<()>>,
}

impl EffectUpdateScheduler {
    pub fn new(
        on_live: impl Fn(&EffectParameters) + Send + 'static,
        on_refresh: impl Fn(&EffectParameters) + Send + 'static,
    ) -> Self {
        Self::with_windows(DebounceWindows::default(), on_live, on_refresh)
    }

    pub fn with_windows(
        windows: DebounceWindows,
        on_live: impl Fn(&EffectParameters) + Send + 'static,
        on_refresh: impl Fn(&EffectParameters) + Send + 'static,
    ) -> Self {
        let (tx, rx) = mpsc::channel::<EffectParameters>();
        let handle = thread::Builder::new()
            .name("effect-updates".into())
            .spawn(move || run(rx, windows, on_live, on_refresh))
            .ok();

        Self {
            tx: Some(tx),
            handle,
        }
    }

    /// Queue a snapshot. Supersedes any snapshot still waiting out its
    /// debounce window.
    pub fn submit(&self, params: EffectParameters) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(params);
        }
    }
}

impl Drop for EffectUpdateScheduler {
    fn drop(&mut self) {
        self.tx.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn run(
    rx: mpsc::Receiver<EffectParameters>,
    windows: DebounceWindows,
    on_live: impl Fn(&EffectParameters),
    on_refresh: impl Fn(&EffectParameters),
) {
    let mut pending: Option<(EffectParameters, Instant)> = None;
    let mut live_applied = false;

    loop {
        let timeout = match &pending {
            Some((_, since)) => {
                let elapsed = since.elapsed();
                let next = if live_applied {
                    windows.offline_refresh
                } else {
                    windows.live_apply
                };
                next.saturating_sub(elapsed)
            }
            // Idle; park until something arrives.
            None => Duration::from_secs(3600),
        };

        match rx.recv_timeout(timeout) {
            Ok(params) => {
                pending = Some((params, Instant::now()));
                live_applied = false;
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                if let Some((params, since)) = &pending {
                    let age = since.elapsed();
                    if !live_applied && age >= windows.live_apply {
                        on_live(params);
                        live_applied = true;
                    }
                    if age >= windows.offline_refresh {
                        on_refresh(params);
                        pending = None;
                        live_applied = false;
                    }
                }
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                // Flush whatever was still waiting, then exit.
                if let Some((params, _)) = pending.take() {
                    if !live_applied {
                        on_live(&params);
                    }
                    on_refresh(&params);
                }
                break;
            }
        }
    }
}
