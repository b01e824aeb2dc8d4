/*
| state   | Play    | Pause  | Resume  | Stop    | SourceEnded |
| ------- | ------- | ------ | ------- | ------- | ----------- |
| Stopped | Playing | -      | -       | -       | -           |
| Playing | -       | Paused | -       | Stopped | Stopped     |
| Paused  | Playing | -      | Playing | Stopped | -           |

Play from Paused resumes: a UI with a single play button never needs to
track whether it should send Resume instead.

"-" means the command is ignored (no transition, no error): transport
commands arrive from a UI that may race against the end of the signal, so
stale commands must be harmless.
*/

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    Stopped,
    Playing,
    Paused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportCommand {
    Play,
    Pause,
    Resume,
    Stop,
    /// The chain ran out of signal (source plus reverb tail).
    SourceEnded,
}

/// Apply a command to a state. `None` means the command does not apply in
/// this state and should be dropped.
pub fn apply(state: TransportState, command: TransportCommand) -> Option<TransportState> {
    use TransportCommand::*;
    use TransportState::*;

    match (state, command) {
        (Stopped, Play) => Some(Playing),
        (Playing, Pause) => Some(Paused),
        (Playing, Stop) | (Playing, SourceEnded) => Some(Stopped),
        (Paused, Play) | (Paused, Resume) => Some(Playing),
        (Paused, Stop) => Some(Stopped),
        _ => None,
    }
}
