//! Movable pieces built from a shape and its precomputed rotations

use crate::error::{Result, TetrisError};
use crate::shape::Shape;
use std::sync::Arc;

/// Number of rotation states per piece
pub const ROTATIONS: usize = 4;

/// Spawn column of a freshly chosen piece
pub const SPAWN_X: i32 = 3;
/// Spawn row of a freshly chosen piece
pub const SPAWN_Y: i32 = 0;
/// Default fall speed in rows per second
pub const DEFAULT_FALL_SPEED: f32 = 1.0;

/// A piece: a type id, its four rotations and where it currently sits.
///
/// `x`/`y` locate the top-left corner of the shape matrix on the grid, so a
/// local cell (cx, cy) occupies grid cell (x + cx, y + cy). Clones share the
/// rotation set, which is never mutated after construction.
#[derive(Debug, Clone)]
pub struct Piece {
    id: u8,
    shapes: Arc<[Shape; ROTATIONS]>,
    rotation: usize,
    pub x: i32,
    pub y: i32,
    fall_speed: f32,
}

impl Piece {
    /// Create a piece at the spawn position with rotations 1-3 derived from
    /// `base` by successive quarter turns.
    pub fn new(base: Shape, id: u8) -> Result<Self> {
        if id == 0 {
            return Err(TetrisError::InvalidPiece(
                "piece id 0 is reserved for empty cells".into(),
            ));
        }
        let r1 = base.rotated()?;
        let r2 = r1.rotated()?;
        let r3 = r2.rotated()?;
        Ok(Self {
            id,
            shapes: Arc::new([base, r1, r2, r3]),
            rotation: 0,
            x: SPAWN_X,
            y: SPAWN_Y,
            fall_speed: DEFAULT_FALL_SPEED,
        })
    }

    /// Put the piece back at its spawn state.
    pub fn reset(&mut self, fall_speed: f32) {
        self.x = SPAWN_X;
        self.y = SPAWN_Y;
        self.rotation = 0;
        self.fall_speed = fall_speed;
    }

    pub fn id(&self) -> u8 {
        self.id
    }

    pub fn rotation(&self) -> usize {
        self.rotation
    }

    pub fn fall_speed(&self) -> f32 {
        self.fall_speed
    }

    /// Advance to the next rotation, wrapping 3 -> 0. Placement is validated
    /// by the caller.
    pub fn rotate_next(&mut self) {
        self.rotation = (self.rotation + 1) % ROTATIONS;
    }

    pub fn set_rotation(&mut self, rotation: usize) -> Result<()> {
        if rotation >= ROTATIONS {
            return Err(TetrisError::InvalidRotation(rotation));
        }
        self.rotation = rotation;
        Ok(())
    }

    /// Put back a rotation previously read from this piece
    pub(crate) fn restore_rotation(&mut self, rotation: usize) {
        debug_assert!(rotation < ROTATIONS);
        self.rotation = rotation % ROTATIONS;
    }

    pub fn current_shape(&self) -> &Shape {
        &self.shapes[self.rotation]
    }

    pub fn shape_at(&self, rotation: usize) -> Result<&Shape> {
        self.shapes
            .get(rotation)
            .ok_or(TetrisError::InvalidRotation(rotation))
    }

    /// Whether two pieces share the same rotation set allocation.
    pub fn shares_shapes_with(&self, other: &Piece) -> bool {
        Arc::ptr_eq(&self.shapes, &other.shapes)
    }

    /// Grid column of the left edge of the current bounding box
    pub fn left(&self) -> i32 {
        self.x + self.current_shape().origin_x() as i32
    }

    /// Grid row of the top edge of the current bounding box
    pub fn top(&self) -> i32 {
        self.y + self.current_shape().origin_y() as i32
    }

    /// Grid cells covered by the current rotation at `(x, y)`.
    pub fn cells_at(&self, x: i32, y: i32) -> impl Iterator<Item = (i32, i32)> + '_ {
        self.current_shape()
            .cells()
            .map(move |(cx, cy)| (x + cx as i32, y + cy as i32))
    }

    /// Grid cells covered at the current position.
    pub fn cells(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        self.cells_at(self.x, self.y)
    }
}
