//! Occupancy grid for defender placement.
//!
//! The grid is fixed at construction: `rows` lanes by `cols` columns.
//! Cells are centered on the world origin with a constant spacing between
//! them, and the same arithmetic is used both to place cell centers and to
//! map world positions back onto cells.
//!
//! A cell only ever changes state through [`GridField::try_occupy`] and
//! [`GridField::free`]. `try_occupy` checks the cell before writing, so a
//! double-occupied cell cannot be produced.

use serde::{Deserialize, Serialize};

use crate::components::UnitId;
use crate::error::{GameError, Result};
use crate::math::{decimal_serde, Fixed, Vec2Fixed};

/// Row/column address of a grid cell. The row doubles as the lane index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridCoord {
    /// Row (lane).
    pub row: u32,
    /// Column along the lane.
    pub col: u32,
}

impl GridCoord {
    /// Create a new coordinate.
    #[must_use]
    pub const fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }
}

/// Occupancy of a single cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CellState {
    /// No defender.
    #[default]
    Empty,
    /// Held by the given defender.
    Occupied(UnitId),
}

/// Grid dimensions and world-space cell geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct GridLayout {
    /// Number of rows (lanes).
    pub rows: u32,
    /// Number of columns per lane.
    pub cols: u32,
    /// Side length of a cell in world units.
    #[serde(with = "decimal_serde")]
    pub cell_size: Fixed,
    /// Gap between adjacent cells in world units.
    #[serde(with = "decimal_serde")]
    pub cell_spacing: Fixed,
}

impl Default for GridLayout {
    fn default() -> Self {
        Self {
            rows: 5,
            cols: 9,
            cell_size: Fixed::ONE,
            cell_spacing: Fixed::from_num(0.1),
        }
    }
}

impl GridLayout {
    /// Distance between adjacent cell centers.
    #[must_use]
    pub fn pitch(&self) -> Fixed {
        self.cell_size + self.cell_spacing
    }

    /// Total extent along the lane axis.
    #[must_use]
    pub fn total_width(&self) -> Fixed {
        Self::span(self.cols, self.pitch(), self.cell_spacing)
    }

    /// Total extent across lanes.
    #[must_use]
    pub fn total_height(&self) -> Fixed {
        Self::span(self.rows, self.pitch(), self.cell_spacing)
    }

    fn span(count: u32, pitch: Fixed, spacing: Fixed) -> Fixed {
        if count == 0 {
            return Fixed::ZERO;
        }
        pitch * Fixed::from_num(count) - spacing
    }

    fn axis_center(index: u32, total: Fixed, pitch: Fixed, cell_size: Fixed) -> Fixed {
        let start = -total / Fixed::from_num(2) + cell_size / Fixed::from_num(2);
        start + pitch * Fixed::from_num(index)
    }

    fn axis_index(coord: Fixed, total: Fixed, pitch: Fixed, count: u32) -> Option<u32> {
        let offset = coord + total / Fixed::from_num(2);
        if offset < Fixed::ZERO {
            return None;
        }
        let index = (offset / pitch).floor().to_num::<i64>();
        u32::try_from(index).ok().filter(|&i| i < count)
    }

    /// Reject layouts that cannot hold a unit.
    pub fn validate(&self) -> Result<()> {
        if self.rows == 0 || self.cols == 0 {
            return Err(GameError::InvalidConfig(format!(
                "grid must have at least one cell, got {}x{}",
                self.rows, self.cols
            )));
        }
        if self.cell_size <= Fixed::ZERO || self.cell_spacing < Fixed::ZERO {
            return Err(GameError::InvalidConfig(
                "cell size must be positive and spacing non-negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// The placement grid.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GridField {
    layout: GridLayout,
    cells: Vec<CellState>,
}

impl GridField {
    /// Create an empty grid with the given layout.
    #[must_use]
    pub fn new(layout: GridLayout) -> Self {
        let len = layout.rows as usize * layout.cols as usize;
        Self {
            layout,
            cells: vec![CellState::Empty; len],
        }
    }

    /// Grid geometry.
    #[must_use]
    pub const fn layout(&self) -> &GridLayout {
        &self.layout
    }

    /// Number of rows (lanes).
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.layout.rows
    }

    /// Number of columns.
    #[must_use]
    pub const fn cols(&self) -> u32 {
        self.layout.cols
    }

    /// Whether `(row, col)` lies on the grid.
    #[must_use]
    pub const fn contains(&self, row: u32, col: u32) -> bool {
        row < self.layout.rows && col < self.layout.cols
    }

    fn index(&self, row: u32, col: u32) -> Option<usize> {
        self.contains(row, col)
            .then(|| row as usize * self.layout.cols as usize + col as usize)
    }

    /// Claim an empty cell for `unit`.
    ///
    /// Returns `false` without touching the grid if the cell is out of
    /// bounds or already occupied.
    pub fn try_occupy(&mut self, row: u32, col: u32, unit: UnitId) -> bool {
        let Some(index) = self.index(row, col) else {
            return false;
        };
        match self.cells[index] {
            CellState::Occupied(_) => false,
            CellState::Empty => {
                self.cells[index] = CellState::Occupied(unit);
                true
            }
        }
    }

    /// Release a cell. Freeing an empty or out-of-bounds cell is a no-op.
    pub fn free(&mut self, row: u32, col: u32) {
        if let Some(index) = self.index(row, col) {
            self.cells[index] = CellState::Empty;
        }
    }

    /// Whether the cell exists and holds no defender.
    ///
    /// Out-of-bounds cells report `false`: nothing can be placed there.
    #[must_use]
    pub fn is_empty(&self, row: u32, col: u32) -> bool {
        self.cell(row, col) == Some(CellState::Empty)
    }

    /// State of a cell, or `None` when out of bounds.
    #[must_use]
    pub fn cell(&self, row: u32, col: u32) -> Option<CellState> {
        self.index(row, col).map(|index| self.cells[index])
    }

    /// Defender holding a cell, if any.
    #[must_use]
    pub fn occupant(&self, row: u32, col: u32) -> Option<UnitId> {
        match self.cell(row, col)? {
            CellState::Occupied(unit) => Some(unit),
            CellState::Empty => None,
        }
    }

    /// Iterate occupied cells in row-major order.
    pub fn occupied(&self) -> impl Iterator<Item = (GridCoord, UnitId)> + '_ {
        let cols = self.layout.cols.max(1);
        self.cells
            .iter()
            .enumerate()
            .filter_map(move |(index, cell)| match *cell {
                CellState::Occupied(unit) => {
                    let index = u32::try_from(index).ok()?;
                    Some((GridCoord::new(index / cols, index % cols), unit))
                }
                CellState::Empty => None,
            })
    }

    /// Empty every cell.
    pub fn clear(&mut self) {
        self.cells.fill(CellState::Empty);
    }

    /// World-space center of a cell.
    #[must_use]
    pub fn cell_center(&self, coord: GridCoord) -> Option<Vec2Fixed> {
        if !self.contains(coord.row, coord.col) {
            return None;
        }
        let layout = &self.layout;
        Some(Vec2Fixed::new(
            GridLayout::axis_center(
                coord.col,
                layout.total_width(),
                layout.pitch(),
                layout.cell_size,
            ),
            self.lane_y(coord.row)?,
        ))
    }

    /// Across-lane coordinate of a lane's center line.
    #[must_use]
    pub fn lane_y(&self, lane: u32) -> Option<Fixed> {
        let layout = &self.layout;
        (lane < layout.rows).then(|| {
            GridLayout::axis_center(
                lane,
                layout.total_height(),
                layout.pitch(),
                layout.cell_size,
            )
        })
    }

    /// Map a world position to the cell under it.
    ///
    /// Positions that fall in the spacing after a cell map to that cell.
    /// Anything outside the grid's extent yields `None`.
    #[must_use]
    pub fn world_to_grid(&self, position: Vec2Fixed) -> Option<GridCoord> {
        let layout = &self.layout;
        let col = GridLayout::axis_index(
            position.x,
            layout.total_width(),
            layout.pitch(),
            layout.cols,
        )?;
        let row = GridLayout::axis_index(
            position.y,
            layout.total_height(),
            layout.pitch(),
            layout.rows,
        )?;
        Some(GridCoord::new(row, col))
    }
}
