//! Grid of placed track tiles

use serde::{Deserialize, Serialize};

use super::catalog::{ConnectorMask, Direction, Rotation, TrackPartCatalog};
use crate::error::{Result, SimError};

/// A placed tile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackCell {
    pub part_id: String,
    pub rotation: Rotation,
}

impl TrackCell {
    pub fn new(part_id: &str, rotation: Rotation) -> Self {
        Self {
            part_id: part_id.to_string(),
            rotation,
        }
    }

    /// Connectors after rotation; None for parts the catalog lacks
    pub fn mask(&self, catalog: &TrackPartCatalog) -> Option<ConnectorMask> {
        catalog.get(&self.part_id).map(|p| p.mask_at(self.rotation))
    }
}

/// Largest accepted row or column count
pub const MAX_GRID_DIM: usize = 64;

/// Row-major grid of optional tiles
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackGrid {
    rows: usize,
    cols: usize,
    cells: Vec<Option<TrackCell>>,
}

impl TrackGrid {
    /// Empty grid; each side must be in `1..=MAX_GRID_DIM`
    pub fn new(rows: usize, cols: usize) -> Result<Self> {
        if !(1..=MAX_GRID_DIM).contains(&rows) || !(1..=MAX_GRID_DIM).contains(&cols) {
            return Err(SimError::InvalidGridSize { rows, cols });
        }
        Ok(Self {
            rows,
            cols,
            cells: vec![None; rows * cols],
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn contains(&self, r: usize, c: usize) -> bool {
        r < self.rows && c < self.cols
    }

    pub fn get(&self, r: usize, c: usize) -> Option<&TrackCell> {
        if !self.contains(r, c) {
            return None;
        }
        self.cells[r * self.cols + c].as_ref()
    }

    pub fn set(&mut self, r: usize, c: usize, cell: Option<TrackCell>) -> Result<()> {
        if !self.contains(r, c) {
            return Err(SimError::CellOutOfRange { r, c });
        }
        self.cells[r * self.cols + c] = cell;
        Ok(())
    }

    pub fn clear(&mut self) {
        self.cells.iter_mut().for_each(|c| *c = None);
    }

    /// Neighbor coordinates in a direction, if inside the grid
    pub fn neighbor(&self, r: usize, c: usize, d: Direction) -> Option<(usize, usize)> {
        let (dr, dc) = d.offset();
        let nr = r.checked_add_signed(dr)?;
        let nc = c.checked_add_signed(dc)?;
        self.contains(nr, nc).then_some((nr, nc))
    }

    /// Filled cells in row-major order
    pub fn filled(&self) -> impl Iterator<Item = ((usize, usize), &TrackCell)> {
        self.cells
            .iter()
            .enumerate()
            .filter_map(|(i, cell)| cell.as_ref().map(|c| ((i / self.cols, i % self.cols), c)))
    }

    pub fn filled_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get() {
        let mut grid = TrackGrid::new(2, 3).unwrap();
        grid.set(1, 2, Some(TrackCell::new("corner", Rotation::R90))).unwrap();
        assert_eq!(grid.get(1, 2).unwrap().rotation, Rotation::R90);
        assert!(grid.get(0, 0).is_none());
        assert!(grid.get(5, 5).is_none());
        assert!(matches!(
            grid.set(2, 0, None),
            Err(SimError::CellOutOfRange { r: 2, c: 0 })
        ));
    }

    #[test]
    fn test_size_limits() {
        assert!(TrackGrid::new(1, 1).is_ok());
        assert!(TrackGrid::new(MAX_GRID_DIM, MAX_GRID_DIM).is_ok());
        assert!(matches!(
            TrackGrid::new(0, 4),
            Err(SimError::InvalidGridSize { rows: 0, cols: 4 })
        ));
        assert!(matches!(
            TrackGrid::new(2, MAX_GRID_DIM + 1),
            Err(SimError::InvalidGridSize { .. })
        ));
        assert!(TrackGrid::new(usize::MAX, 2).is_err());
    }

    #[test]
    fn test_neighbors_respect_edges() {
        let grid = TrackGrid::new(2, 2).unwrap();
        assert_eq!(grid.neighbor(0, 0, Direction::North), None);
        assert_eq!(grid.neighbor(0, 0, Direction::West), None);
        assert_eq!(grid.neighbor(0, 0, Direction::East), Some((0, 1)));
        assert_eq!(grid.neighbor(1, 1, Direction::South), None);
    }

    #[test]
    fn test_filled_iteration() {
        let mut grid = TrackGrid::new(2, 2).unwrap();
        grid.set(0, 1, Some(TrackCell::new("straight", Rotation::R0))).unwrap();
        grid.set(1, 0, Some(TrackCell::new("straight", Rotation::R90))).unwrap();
        let coords: Vec<_> = grid.filled().map(|(rc, _)| rc).collect();
        assert_eq!(coords, [(0, 1), (1, 0)]);
        assert_eq!(grid.filled_count(), 2);
        grid.clear();
        assert_eq!(grid.filled_count(), 0);
    }
}
