//! Tetromino catalog
//!
//! The seven classic pieces as square bitmask matrices. Each kind carries a
//! stable id in `1..=7` which is what the grid stores and what replays record.

use crate::error::Result;
use crate::piece::Piece;
use crate::shape::Shape;

/// Number of piece kinds in the catalog
pub const PIECE_KINDS: usize = 7;

/// The 7 tetromino types, in catalog order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TetrominoType {
    L,
    Z,
    S,
    I,
    O,
    T,
    J,
}

impl TetrominoType {
    /// All tetromino types in catalog order
    pub fn all() -> [TetrominoType; PIECE_KINDS] {
        [
            TetrominoType::L,
            TetrominoType::Z,
            TetrominoType::S,
            TetrominoType::I,
            TetrominoType::O,
            TetrominoType::T,
            TetrominoType::J,
        ]
    }

    /// Piece-type id stored in the grid, `1..=7` (0 is an empty cell)
    pub fn id(self) -> u8 {
        match self {
            TetrominoType::L => 1,
            TetrominoType::Z => 2,
            TetrominoType::S => 3,
            TetrominoType::I => 4,
            TetrominoType::O => 5,
            TetrominoType::T => 6,
            TetrominoType::J => 7,
        }
    }

    pub fn from_id(id: u8) -> Option<TetrominoType> {
        Self::all().into_iter().find(|kind| kind.id() == id)
    }

    pub fn name(self) -> &'static str {
        match self {
            TetrominoType::L => "L",
            TetrominoType::Z => "Z",
            TetrominoType::S => "S",
            TetrominoType::I => "I",
            TetrominoType::O => "O",
            TetrominoType::T => "T",
            TetrominoType::J => "J",
        }
    }

    /// Spawn orientation, row 0 at the top
    pub fn matrix(self) -> &'static [&'static [u8]] {
        match self {
            TetrominoType::L => &[&[0, 0, 1], &[1, 1, 1], &[0, 0, 0]],
            TetrominoType::Z => &[&[1, 1, 0], &[0, 1, 1], &[0, 0, 0]],
            TetrominoType::S => &[&[0, 1, 1], &[1, 1, 0], &[0, 0, 0]],
            TetrominoType::I => &[&[1, 1, 1, 1], &[0, 0, 0, 0], &[0, 0, 0, 0], &[0, 0, 0, 0]],
            TetrominoType::O => &[&[1, 1], &[1, 1]],
            TetrominoType::T => &[&[0, 1, 0], &[1, 1, 1], &[0, 0, 0]],
            TetrominoType::J => &[&[1, 0, 0], &[1, 1, 1], &[0, 0, 0]],
        }
    }

    pub fn shape(self) -> Result<Shape> {
        Shape::new(self.matrix())
    }
}

/// Build one catalog piece per tetromino type, indexed by `id - 1`.
pub fn build_catalog() -> Result<Vec<Piece>> {
    TetrominoType::all()
        .into_iter()
        .map(|kind| Piece::new(kind.shape()?, kind.id()))
        .collect()
}
