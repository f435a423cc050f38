//! ALMOST TETRIS - a deterministic falling-block engine
//!
//! The engine advances in fixed ticks, records every input and piece choice
//! and plays recordings back tick for tick.

pub mod board;
pub mod error;
pub mod game;
pub mod input;
pub mod piece;
pub mod randomizer;
pub mod replay;
pub mod score;
pub mod session;
pub mod settings;
pub mod shape;
pub mod tetromino;

pub use board::Board;
pub use error::{Result, TetrisError};
pub use game::{EngineConfig, Game, Snapshot};
pub use input::{InputIntent, InputKind};
pub use piece::Piece;
pub use replay::{Replay, ReplayFormat, ReplayRecord};
pub use session::{DriverHandle, Session};
pub use settings::Settings;
pub use shape::Shape;
pub use tetromino::TetrominoType;
