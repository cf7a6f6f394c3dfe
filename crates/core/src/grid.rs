//! Row-major free/obstacle grid shared by the synthesizer and the connectivity check.

use xxhash_rust::xxh3::xxh3_64;

use crate::types::{Cell, CellState};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grid {
    height: usize,
    width: usize,
    cells: Vec<CellState>,
}

impl Grid {
    /// All-free grid of the given shape.
    pub fn new(height: usize, width: usize) -> Self {
        Self { height, width, cells: vec![CellState::Free; height * width] }
    }

    /// Rebuilds a grid from a persisted obstacle list. Returns the first
    /// obstacle that falls outside the grid as the error.
    pub fn from_obstacles(height: usize, width: usize, obstacles: &[Cell]) -> Result<Self, Cell> {
        let mut grid = Self::new(height, width);
        for &cell in obstacles {
            if !grid.in_bounds(cell) {
                return Err(cell);
            }
            grid.set(cell, CellState::Obstacle);
        }
        Ok(grid)
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn in_bounds(&self, cell: Cell) -> bool {
        cell.row < self.height && cell.col < self.width
    }

    /// Out-of-bounds cells read as obstacles.
    pub fn state(&self, cell: Cell) -> CellState {
        if !self.in_bounds(cell) {
            return CellState::Obstacle;
        }
        self.cells[self.index(cell)]
    }

    pub fn is_free(&self, cell: Cell) -> bool {
        self.state(cell) == CellState::Free
    }

    /// Panics if `cell` is out of bounds.
    pub fn set(&mut self, cell: Cell, state: CellState) {
        assert!(self.in_bounds(cell), "cell {cell:?} outside {}x{} grid", self.height, self.width);
        let index = self.index(cell);
        self.cells[index] = state;
    }

    /// Obstacle coordinates in row-major order.
    pub fn obstacles(&self) -> Vec<Cell> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, state)| **state == CellState::Obstacle)
            .map(|(index, _)| self.cell_at(index))
            .collect()
    }

    /// In-bounds 4-neighbours in up, right, down, left order.
    pub fn neighbors(&self, cell: Cell) -> impl Iterator<Item = Cell> + '_ {
        let up = cell.row.checked_sub(1).map(|row| Cell { row, col: cell.col });
        let right = Some(Cell { row: cell.row, col: cell.col + 1 });
        let down = Some(Cell { row: cell.row + 1, col: cell.col });
        let left = cell.col.checked_sub(1).map(|col| Cell { row: cell.row, col });
        [up, right, down, left].into_iter().flatten().filter(|next| self.in_bounds(*next))
    }

    pub(crate) fn index(&self, cell: Cell) -> usize {
        cell.row * self.width + cell.col
    }

    pub(crate) fn cell_at(&self, index: usize) -> Cell {
        Cell { row: index / self.width, col: index % self.width }
    }

    pub(crate) fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(16 + self.cells.len());
        bytes.extend((self.height as u64).to_le_bytes());
        bytes.extend((self.width as u64).to_le_bytes());
        for state in &self.cells {
            bytes.push(match state {
                CellState::Free => 0,
                CellState::Obstacle => 1,
            });
        }
        bytes
    }

    pub fn fingerprint(&self) -> u64 {
        xxh3_64(&self.canonical_bytes())
    }
}
