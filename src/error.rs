//! Error taxonomy for the engine and the replay codec

use thiserror::Error;

/// Errors surfaced by shape construction, the piece catalog and replays.
///
/// Invalid moves are never reported here: the engine absorbs them by
/// rolling the active piece back within the tick.
#[derive(Debug, Error)]
pub enum TetrisError {
    /// Malformed or empty shape definition
    #[error("invalid shape: {0}")]
    InvalidShape(String),
    #[error("invalid piece: {0}")]
    InvalidPiece(String),
    /// Rotation index outside `0..4`
    #[error("invalid rotation index {0} (expected 0..4)")]
    InvalidRotation(usize),
    /// Replay stream that cannot be decoded
    #[error("corrupt replay: {0}")]
    CorruptReplay(String),
    /// A replay cursor was advanced past the end of its sequence
    #[error("replay exhausted: cursor {cursor} of {len}")]
    ReplayExhausted { cursor: usize, len: usize },
    #[error("configuration error: {0}")]
    Config(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TetrisError>;
