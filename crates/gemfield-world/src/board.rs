//! Grid geometry: integer cells to world positions and bounds checks.
//!
//! The coordination core only consumes geometry through the
//! [`GridGeometry`] trait. [`Board`] is the rectangular implementation used
//! by the engine: the grid is centred on `origin`, one `cell_size` apart.

use gemfield_types::{Cell, Position};

use crate::error::WorldError;

/// Maps cells to world positions and validates bounds.
pub trait GridGeometry: Send + Sync {
    /// Number of columns.
    fn width(&self) -> i32;

    /// Number of rows.
    fn depth(&self) -> i32;

    /// World-space centre of `cell`.
    fn cell_to_position(&self, cell: Cell) -> Position;

    /// Whether `cell` satisfies `0 <= x < width` and `0 <= z < depth`.
    fn is_in_bounds(&self, cell: Cell) -> bool {
        cell.x >= 0 && cell.x < self.width() && cell.z >= 0 && cell.z < self.depth()
    }

    /// The cell whose centre is closest to `position`.
    ///
    /// Scans rows then columns; the first strictly closer cell wins, so ties
    /// resolve to the lowest row, then the lowest column.
    fn nearest_cell(&self, position: Position) -> Cell {
        let mut best = Cell::new(0, 0);
        let mut best_distance = f64::MAX;
        for z in 0..self.depth() {
            for x in 0..self.width() {
                let cell = Cell::new(x, z);
                let distance = self.cell_to_position(cell).distance_squared(position);
                if distance < best_distance {
                    best_distance = distance;
                    best = cell;
                }
            }
        }
        best
    }
}

/// A rectangular board of `width x depth` square cells.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Board {
    width: i32,
    depth: i32,
    cell_size: f64,
    origin: Position,
}

impl Board {
    /// Create a board centred on `origin`.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidDimensions`] if either dimension is not
    /// positive, or [`WorldError::InvalidCellSize`] if `cell_size` is not a
    /// finite positive number.
    pub fn new(width: i32, depth: i32, cell_size: f64, origin: Position) -> Result<Self, WorldError> {
        if width <= 0 || depth <= 0 {
            return Err(WorldError::InvalidDimensions { width, depth });
        }
        if !cell_size.is_finite() || cell_size <= 0.0 {
            return Err(WorldError::InvalidCellSize(cell_size));
        }
        Ok(Self {
            width,
            depth,
            cell_size,
            origin,
        })
    }

    /// Side length of one cell in world units.
    pub const fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// World position of the board centre.
    pub const fn origin(&self) -> Position {
        self.origin
    }

    /// Every in-bounds cell, row by row.
    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        (0..self.depth).flat_map(move |z| (0..self.width).map(move |x| Cell::new(x, z)))
    }

    /// Offset of index `i` from the centre of an axis of `len` cells.
    fn axis_offset(&self, i: i32, len: i32) -> f64 {
        let centre = f64::from(len.saturating_sub(1)) * 0.5;
        (f64::from(i) - centre) * self.cell_size
    }
}

impl GridGeometry for Board {
    fn width(&self) -> i32 {
        self.width
    }

    fn depth(&self) -> i32 {
        self.depth
    }

    fn cell_to_position(&self, cell: Cell) -> Position {
        Position::new(
            self.origin.x + self.axis_offset(cell.x, self.width),
            self.origin.z + self.axis_offset(cell.z, self.depth),
        )
    }
}
