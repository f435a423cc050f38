//! Game grid representation and collision detection

use std::fmt;

/// Standard grid dimensions
pub const BOARD_WIDTH: usize = 10;
pub const BOARD_HEIGHT: usize = 20;
/// Pixel size of one cell, for renderers
pub const TILE_SIZE: u32 = 18;

/// Cell value of an empty cell; locked cells hold their piece-type id
pub const EMPTY: u8 = 0;

/// The game grid. Row 0 is the top row, rows increase downward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    width: usize,
    height: usize,
    /// Cells stored row-major, `cells[row * width + col]`
    cells: Vec<u8>,
}

impl Default for Board {
    fn default() -> Self {
        Self::new(BOARD_WIDTH, BOARD_HEIGHT)
    }
}

impl Board {
    /// Create an empty grid
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![EMPTY; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    fn index(&self, col: i32, row: i32) -> Option<usize> {
        if !self.in_bounds(col, row) {
            return None;
        }
        Some(row as usize * self.width + col as usize)
    }

    pub fn in_bounds(&self, col: i32, row: i32) -> bool {
        col >= 0 && row >= 0 && (col as usize) < self.width && (row as usize) < self.height
    }

    /// Get the cell at (col, row), `None` if out of bounds
    pub fn get(&self, col: i32, row: i32) -> Option<u8> {
        self.index(col, row).map(|i| self.cells[i])
    }

    /// Set a cell, returns false if out of bounds
    pub fn set(&mut self, col: i32, row: i32, value: u8) -> bool {
        match self.index(col, row) {
            Some(i) => {
                self.cells[i] = value;
                true
            }
            None => false,
        }
    }

    /// A locked cell sits at (col, row). Out of bounds is never occupied.
    pub fn is_occupied(&self, col: i32, row: i32) -> bool {
        self.get(col, row).is_some_and(|v| v != EMPTY)
    }

    /// Whether any of the given cells hits a locked cell
    pub fn collides(&self, mut cells: impl Iterator<Item = (i32, i32)>) -> bool {
        cells.any(|(col, row)| self.is_occupied(col, row))
    }

    /// Write `id` into every in-bounds cell
    pub fn lock(&mut self, cells: impl Iterator<Item = (i32, i32)>, id: u8) {
        for (col, row) in cells {
            self.set(col, row, id);
        }
    }

    /// Check if a row is completely filled
    pub fn is_line_full(&self, row: usize) -> bool {
        self.row(row).is_some_and(|cells| cells.iter().all(|&v| v != EMPTY))
    }

    /// Remove `row`, shifting every row above it down by one. Row 0 becomes
    /// empty.
    pub fn collapse_row(&mut self, row: usize) {
        if row >= self.height {
            return;
        }
        let w = self.width;
        self.cells.copy_within(0..row * w, w);
        self.cells[..w].fill(EMPTY);
    }

    pub fn row(&self, row: usize) -> Option<&[u8]> {
        if row >= self.height {
            return None;
        }
        Some(&self.cells[row * self.width..(row + 1) * self.width])
    }

    /// Rows from top to bottom
    pub fn rows(&self) -> impl Iterator<Item = &[u8]> {
        self.cells.chunks(self.width)
    }

    /// Copy out as nested rows
    pub fn to_rows(&self) -> Vec<Vec<u8>> {
        self.rows().map(<[u8]>::to_vec).collect()
    }

    pub fn clear(&mut self) {
        self.cells.fill(EMPTY);
    }

    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(|&v| v == EMPTY)
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.rows() {
            for &v in row {
                if v == EMPTY {
                    write!(f, ".")?;
                } else {
                    write!(f, "{}", v)?;
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
