//! Tick input contract
//!
//! Drivers accumulate key presses into an [`InputIntent`] between ticks and
//! the engine consumes and clears it once per tick. Replays store the same
//! presses as [`InputKind`] codes.

use crate::error::{Result, TetrisError};
use serde::{Deserialize, Serialize};

/// One discrete player input, as recorded in replays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InputKind {
    MoveLeft,
    MoveRight,
    /// Drop one row
    SoftDrop,
    Rotate,
    HardDrop,
}

impl InputKind {
    pub fn all() -> [InputKind; 5] {
        [
            InputKind::MoveLeft,
            InputKind::MoveRight,
            InputKind::SoftDrop,
            InputKind::Rotate,
            InputKind::HardDrop,
        ]
    }

    /// Wire code in the binary replay format
    pub fn code(self) -> u8 {
        match self {
            InputKind::MoveLeft => 0,
            InputKind::MoveRight => 1,
            InputKind::SoftDrop => 2,
            InputKind::Rotate => 3,
            InputKind::HardDrop => 4,
        }
    }

    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            0 => Ok(InputKind::MoveLeft),
            1 => Ok(InputKind::MoveRight),
            2 => Ok(InputKind::SoftDrop),
            3 => Ok(InputKind::Rotate),
            4 => Ok(InputKind::HardDrop),
            other => Err(TetrisError::CorruptReplay(format!(
                "unknown input code {}",
                other
            ))),
        }
    }

    /// Name used by the text replay format
    pub fn name(self) -> &'static str {
        match self {
            InputKind::MoveLeft => "left",
            InputKind::MoveRight => "right",
            InputKind::SoftDrop => "down",
            InputKind::Rotate => "rotate",
            InputKind::HardDrop => "drop",
        }
    }

    pub fn from_name(name: &str) -> Result<Self> {
        Self::all()
            .into_iter()
            .find(|kind| kind.name() == name)
            .ok_or_else(|| TetrisError::CorruptReplay(format!("unknown input name {:?}", name)))
    }
}

/// Everything the player asked for during one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputIntent {
    /// -1 left, 0 none, 1 right
    pub move_x: i8,
    /// Extra rows of soft drop
    pub move_y: u32,
    pub rotate: bool,
    pub hard_drop: bool,
}

impl InputIntent {
    /// Fold one key press into the intent.
    pub fn apply(&mut self, kind: InputKind) {
        match kind {
            InputKind::MoveLeft => self.move_x = (self.move_x - 1).max(-1),
            InputKind::MoveRight => self.move_x = (self.move_x + 1).min(1),
            InputKind::SoftDrop => self.move_y += 1,
            InputKind::Rotate => self.rotate = true,
            InputKind::HardDrop => self.hard_drop = true,
        }
    }

    /// The presses that rebuild this intent when applied to a neutral one,
    /// in the order they are recorded.
    pub fn kinds(&self) -> Vec<InputKind> {
        let mut kinds = Vec::new();
        match self.move_x {
            x if x < 0 => kinds.push(InputKind::MoveLeft),
            x if x > 0 => kinds.push(InputKind::MoveRight),
            _ => {}
        }
        if self.rotate {
            kinds.push(InputKind::Rotate);
        }
        kinds.extend(std::iter::repeat_n(InputKind::SoftDrop, self.move_y as usize));
        if self.hard_drop {
            kinds.push(InputKind::HardDrop);
        }
        kinds
    }

    pub fn is_neutral(&self) -> bool {
        *self == Self::default()
    }

    /// Consume the intent, leaving a neutral one behind
    pub fn take(&mut self) -> Self {
        std::mem::take(self)
    }
}

impl From<InputKind> for InputIntent {
    fn from(kind: InputKind) -> Self {
        let mut intent = Self::default();
        intent.apply(kind);
        intent
    }
}
