//! Square bitmask shapes and their derived bounding boxes

use crate::error::{Result, TetrisError};
use std::fmt;

/// An immutable square bitmask with a derived origin and bounding box.
///
/// The origin is the top-most and left-most coordinate holding a set cell
/// (taken independently per axis). Width and height are measured from the
/// origin to the farthest set cell found while scanning to the matrix edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shape {
    /// Cells stored row-major, `cells[y * size + x]`
    cells: Box<[bool]>,
    size: usize,
    origin_x: usize,
    origin_y: usize,
    width: usize,
    height: usize,
}

impl Shape {
    /// Build a shape from square matrix rows, row 0 at the top.
    pub fn new<R: AsRef<[u8]>>(rows: &[R]) -> Result<Self> {
        let size = rows.len();
        if size == 0 {
            return Err(TetrisError::InvalidShape("matrix is empty".into()));
        }
        let mut cells = Vec::with_capacity(size * size);
        for (y, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.len() != size {
                return Err(TetrisError::InvalidShape(format!(
                    "row {} has {} cells, expected {}",
                    y,
                    row.len(),
                    size
                )));
            }
            cells.extend(row.iter().map(|&c| c != 0));
        }
        Self::from_cells(cells, size)
    }

    fn from_cells(cells: Vec<bool>, size: usize) -> Result<Self> {
        let set = |x: usize, y: usize| cells[y * size + x];

        let mut origin: Option<(usize, usize)> = None;
        for y in 0..size {
            for x in 0..size {
                if set(x, y) {
                    origin = Some(match origin {
                        Some((ox, oy)) => (ox.min(x), oy.min(y)),
                        None => (x, y),
                    });
                }
            }
        }
        let Some((origin_x, origin_y)) = origin else {
            return Err(TetrisError::InvalidShape("no cell is set".into()));
        };

        // Farthest set cell seen scanning from the origin to the matrix edge
        let (mut last_x, mut last_y) = (0, 0);
        for y in origin_y..size {
            for x in origin_x..size {
                if set(x, y) {
                    last_x = last_x.max(x);
                    last_y = last_y.max(y);
                }
            }
        }

        Ok(Self {
            cells: cells.into_boxed_slice(),
            size,
            origin_x,
            origin_y,
            width: last_x.saturating_sub(origin_x) + 1,
            height: last_y.saturating_sub(origin_y) + 1,
        })
    }

    /// Rotate a quarter turn: cell (x, y) moves to (size - 1 - y, x).
    pub fn rotated(&self) -> Result<Self> {
        let n = self.size;
        let mut cells = vec![false; n * n];
        for y in 0..n {
            for x in 0..n {
                cells[x * n + (n - 1 - y)] = self.cells[y * n + x];
            }
        }
        Self::from_cells(cells, n)
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn origin_x(&self) -> usize {
        self.origin_x
    }

    pub fn origin_y(&self) -> usize {
        self.origin_y
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Whether the local cell (x, y) is set; out of range reads as unset.
    pub fn is_set(&self, x: usize, y: usize) -> bool {
        x < self.size && y < self.size && self.cells[y * self.size + x]
    }

    /// Local coordinates of every set cell, row by row.
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let n = self.size;
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, set)| **set)
            .map(move |(i, _)| (i % n, i / n))
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "({} x {}): {}", self.width, self.height, self.size)?;
        writeln!(f, "origin: {},{}", self.origin_x, self.origin_y)?;
        for y in 0..self.size {
            for x in 0..self.size {
                write!(f, "{}", if self.is_set(x, y) { '#' } else { '.' })?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
