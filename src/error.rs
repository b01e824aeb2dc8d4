//! Engine error taxonomy.
//!
//! The policy is "clamp where a sane clamp exists": out-of-range scalar
//! parameters are clamped by [`crate::params::EffectParameters::sanitized`],
//! and only values with no sensible clamp (non-finite floats, malformed
//! buffers) are rejected here.

/// Errors surfaced by buffer construction, graph building, playback and
/// offline rendering.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    /// The input buffer has zero frames; no graph is built for it.
    EmptyBuffer,
    /// No output device could be acquired, or no buffer is loaded.
    /// Recoverable: the caller may retry (typically after a user gesture).
    PlaybackUnavailable(String),
    /// A parameter value that cannot be clamped into range (for example a
    /// NaN slider value or ragged channel lengths).
    InvalidParameter { name: &'static str, value: f32 },
    /// An offline render was superseded by a newer parameter snapshot and
    /// aborted. Never surfaced to users; the refresh path discards it.
    RenderCancelled,
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::EmptyBuffer => {
                write!(f, "input buffer contains no frames")
            }
            EngineError::PlaybackUnavailable(reason) => {
                write!(f, "playback unavailable: {}", reason)
            }
            EngineError::InvalidParameter { name, value } => {
                write!(f, "invalid value {} for parameter `{}`", value, name)
            }
            EngineError::RenderCancelled => {
                write!(f, "offline render superseded by a newer snapshot")
            }
        }
    }
}

impl std::error::Error for EngineError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages_name_the_failure() {
        let err = EngineError::InvalidParameter {
            name: "volume",
            value: f32::NAN,
        };
        let text = err.to_string();
        assert!(text.contains("volume"));

        assert!(EngineError::EmptyBuffer.to_string().contains("no frames"));
    }
}
