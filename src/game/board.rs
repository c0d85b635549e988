use serde::{Deserialize, Serialize};

use crate::error::DecisionError;

pub const STANDARD_WIDTH: usize = 10;
pub const STANDARD_HEIGHT: usize = 20;

/// Board dimensions, fixed for the lifetime of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoardDims {
    pub width: usize,
    pub height: usize,
}

impl BoardDims {
    pub const STANDARD: BoardDims = BoardDims {
        width: STANDARD_WIDTH,
        height: STANDARD_HEIGHT,
    };

    pub fn new(width: usize, height: usize) -> Self {
        BoardDims { width, height }
    }

    pub fn cell_count(self) -> usize {
        self.width * self.height
    }
}

impl Default for BoardDims {
    fn default() -> Self {
        BoardDims::STANDARD
    }
}

/// Row-major occupancy grid. Row 0 is the top, `height - 1` the bottom.
/// A cell holds 0 when empty, otherwise the id of the block occupying it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawBoard")]
pub struct Board {
    width: usize,
    height: usize,
    cells: Vec<u32>,
}

/// Wire form of [`Board`], checked before it becomes one.
#[derive(Deserialize)]
struct RawBoard {
    width: usize,
    height: usize,
    cells: Vec<u32>,
}

impl TryFrom<RawBoard> for Board {
    type Error = DecisionError;

    fn try_from(raw: RawBoard) -> Result<Self, Self::Error> {
        if raw.width == 0 || raw.height == 0 {
            return Err(DecisionError::InvalidSnapshot(format!(
                "board {}x{} has no cells",
                raw.width, raw.height
            )));
        }
        let expected = raw.width.checked_mul(raw.height);
        if expected != Some(raw.cells.len()) {
            return Err(DecisionError::InvalidSnapshot(format!(
                "board {}x{} carries {} cells",
                raw.width,
                raw.height,
                raw.cells.len()
            )));
        }
        Ok(Board {
            width: raw.width,
            height: raw.height,
            cells: raw.cells,
        })
    }
}

impl Board {
    /// Create an empty board.
    pub fn new(dims: BoardDims) -> Self {
        Board {
            width: dims.width,
            height: dims.height,
            cells: vec![0; dims.cell_count()],
        }
    }

    /// Build a board from explicit rows (top row first). All rows must share
    /// the same, non-zero width.
    pub fn from_rows(rows: &[Vec<u32>]) -> Result<Self, DecisionError> {
        let height = rows.len();
        let width = rows.first().map(Vec::len).unwrap_or(0);
        if width == 0 || height == 0 {
            return Err(DecisionError::InvalidSnapshot(
                "board must have at least one row and one column".into(),
            ));
        }
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != width) {
            return Err(DecisionError::InvalidSnapshot(format!(
                "row {} has {} cells, expected {}",
                i,
                row.len(),
                width
            )));
        }
        Ok(Board {
            width,
            height,
            cells: rows.iter().flatten().copied().collect(),
        })
    }

    /// Parse an ASCII picture: `.` is empty, any other character occupied.
    pub fn from_ascii(rows: &[&str]) -> Result<Self, DecisionError> {
        let rows: Vec<Vec<u32>> = rows
            .iter()
            .map(|line| line.chars().map(|c| u32::from(c != '.')).collect())
            .collect();
        Self::from_rows(&rows)
    }

    pub fn dims(&self) -> BoardDims {
        BoardDims::new(self.width, self.height)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Check internal consistency and, when given, the expected match dimensions.
    pub fn validate(&self, expected: Option<BoardDims>) -> Result<(), DecisionError> {
        if self.width == 0 || self.height == 0 {
            return Err(DecisionError::InvalidSnapshot("board has zero size".into()));
        }
        if self.cells.len() != self.width * self.height {
            return Err(DecisionError::InvalidSnapshot(format!(
                "board declares {}x{} but holds {} cells",
                self.width,
                self.height,
                self.cells.len()
            )));
        }
        if let Some(dims) = expected {
            if dims != self.dims() {
                return Err(DecisionError::InvalidSnapshot(format!(
                    "board is {}x{}, expected {}x{}",
                    self.width, self.height, dims.width, dims.height
                )));
            }
        }
        Ok(())
    }

    /// Cell value at (row, col). Panics when out of range.
    pub fn get(&self, row: usize, col: usize) -> u32 {
        self.cells[row * self.width + col]
    }

    pub fn set(&mut self, row: usize, col: usize, value: u32) {
        self.cells[row * self.width + col] = value;
    }

    pub fn is_occupied(&self, row: usize, col: usize) -> bool {
        self.get(row, col) != 0
    }

    /// Whether the signed coordinate lies on the board.
    pub fn contains(&self, row: i32, col: i32) -> bool {
        row >= 0 && col >= 0 && (row as usize) < self.height && (col as usize) < self.width
    }

    /// Raw cells in row-major order.
    pub fn cells(&self) -> &[u32] {
        &self.cells
    }

    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(|&c| c == 0)
    }

    pub fn is_row_full(&self, row: usize) -> bool {
        let start = row * self.width;
        self.cells[start..start + self.width].iter().all(|&c| c != 0)
    }

    /// Remove every full row, shifting the rows above it down. Returns the
    /// number of rows removed.
    pub fn clear_full_rows(&mut self) -> u32 {
        let kept: Vec<&[u32]> = self
            .cells
            .chunks(self.width)
            .filter(|row| row.iter().any(|&c| c == 0))
            .collect();
        let cleared = self.height - kept.len();
        if cleared == 0 {
            return 0;
        }
        let mut cells = vec![0; cleared * self.width];
        for row in kept {
            cells.extend_from_slice(row);
        }
        self.cells = cells;
        cleared as u32
    }
}
