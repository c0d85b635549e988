use serde::{Deserialize, Serialize};

use crate::error::SimulationError;

/// The seven falling shapes. Ids 1..=7 double as the block id stamped into
/// board cells when a piece locks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Shape {
    I,
    O,
    T,
    S,
    Z,
    J,
    L,
}

impl Shape {
    pub const ALL: [Shape; 7] = [
        Shape::I,
        Shape::O,
        Shape::T,
        Shape::S,
        Shape::Z,
        Shape::J,
        Shape::L,
    ];

    pub fn id(self) -> u8 {
        match self {
            Shape::I => 1,
            Shape::O => 2,
            Shape::T => 3,
            Shape::S => 4,
            Shape::Z => 5,
            Shape::J => 6,
            Shape::L => 7,
        }
    }

    pub fn from_id(id: u8) -> Option<Shape> {
        Shape::ALL.get(usize::from(id).checked_sub(1)?).copied()
    }

    /// Side length of the square box the shape rotates in.
    pub fn box_size(self) -> i32 {
        match self {
            Shape::I => 4,
            Shape::O => 2,
            _ => 3,
        }
    }

    /// (row, col) offsets of the spawn orientation inside the bounding box.
    fn base_cells(self) -> [(i32, i32); 4] {
        match self {
            Shape::I => [(1, 0), (1, 1), (1, 2), (1, 3)],
            Shape::O => [(0, 0), (0, 1), (1, 0), (1, 1)],
            Shape::T => [(0, 1), (1, 0), (1, 1), (1, 2)],
            Shape::S => [(0, 1), (0, 2), (1, 0), (1, 1)],
            Shape::Z => [(0, 0), (0, 1), (1, 1), (1, 2)],
            Shape::J => [(0, 0), (1, 0), (1, 1), (1, 2)],
            Shape::L => [(0, 2), (1, 0), (1, 1), (1, 2)],
        }
    }

    /// Offsets after `rotation` clockwise quarter turns inside the bounding box.
    pub fn cells(self, rotation: u8) -> [(i32, i32); 4] {
        let n = self.box_size();
        let mut cells = self.base_cells();
        for _ in 0..(rotation % 4) {
            for cell in cells.iter_mut() {
                *cell = (cell.1, n - 1 - cell.0);
            }
        }
        cells
    }
}

/// The piece currently under the agent's control. `x`/`y` locate the top-left
/// corner of the shape's bounding box; `rotation` counts clockwise quarter turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActivePiece {
    pub shape_id: u8,
    pub x: i32,
    pub y: i32,
    pub rotation: u8,
}

impl ActivePiece {
    pub fn new(shape: Shape, x: i32, y: i32, rotation: u8) -> Self {
        ActivePiece {
            shape_id: shape.id(),
            x,
            y,
            rotation: rotation % 4,
        }
    }

    /// Spawn pose: horizontally centred, top of the board, unrotated.
    pub fn spawn(shape: Shape, board_width: usize) -> Self {
        let x = (board_width as i32 - shape.box_size()) / 2;
        ActivePiece::new(shape, x.max(0), 0, 0)
    }

    pub fn shape(&self) -> Result<Shape, SimulationError> {
        Shape::from_id(self.shape_id).ok_or(SimulationError::UnknownShape(self.shape_id))
    }

    /// Absolute (row, col) coordinates of the four occupied cells.
    pub fn cells(&self) -> Result<[(i32, i32); 4], SimulationError> {
        let mut cells = self.shape()?.cells(self.rotation);
        for cell in cells.iter_mut() {
            *cell = (cell.0 + self.y, cell.1 + self.x);
        }
        Ok(cells)
    }

    pub fn shifted(&self, dx: i32, dy: i32) -> Self {
        ActivePiece {
            x: self.x + dx,
            y: self.y + dy,
            ..*self
        }
    }

    pub fn rotated_cw(&self) -> Self {
        ActivePiece {
            rotation: (self.rotation + 1) % 4,
            ..*self
        }
    }

    pub fn rotated_ccw(&self) -> Self {
        ActivePiece {
            rotation: (self.rotation + 3) % 4,
            ..*self
        }
    }
}
