//! Connector consistency check for tile grids
//!
//! Advisory only: findings are counts, never errors, so an invalid grid
//! can still be saved or raced on.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::catalog::{ConnectorMask, Direction, TrackPartCatalog};
use super::grid::TrackGrid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValidationReport {
    pub filled_cells: usize,
    /// Open connectors facing the grid edge or an empty cell
    pub dangling_connections: usize,
    /// Open connectors facing a filled cell without the matching connector
    /// (cells whose part is not in the catalog count once each)
    pub connection_mismatches: usize,
    /// Groups of cells joined by matched connectors
    pub components: usize,
}

impl ValidationReport {
    /// At least one tile, no mismatches, no dangling ends (a lone tile may dangle)
    pub fn is_valid(&self) -> bool {
        self.filled_cells > 0
            && self.connection_mismatches == 0
            && (self.dangling_connections == 0 || self.filled_cells == 1)
    }
}

/// Check every open connector of every filled cell
pub fn validate(grid: &TrackGrid, catalog: &TrackPartCatalog) -> ValidationReport {
    let mut report = ValidationReport {
        filled_cells: grid.filled_count(),
        ..Default::default()
    };

    for ((r, c), cell) in grid.filled() {
        let Some(mask) = cell.mask(catalog) else {
            log::warn!("Cell ({}, {}) uses unknown part '{}'", r, c, cell.part_id);
            report.connection_mismatches += 1;
            continue;
        };
        for d in mask.directions() {
            match neighbor_mask(grid, catalog, r, c, d) {
                None => report.dangling_connections += 1,
                Some(Some(other)) if other.contains(d.opposite()) => {}
                Some(_) => report.connection_mismatches += 1,
            }
        }
    }

    report.components = count_components(grid, catalog);
    report
}

/// None: no filled neighbor. Some(None): neighbor with unknown part.
fn neighbor_mask(
    grid: &TrackGrid,
    catalog: &TrackPartCatalog,
    r: usize,
    c: usize,
    d: Direction,
) -> Option<Option<ConnectorMask>> {
    let (nr, nc) = grid.neighbor(r, c, d)?;
    grid.get(nr, nc).map(|cell| cell.mask(catalog))
}

fn count_components(grid: &TrackGrid, catalog: &TrackPartCatalog) -> usize {
    let mut seen = vec![false; grid.rows() * grid.cols()];
    let mut components = 0;

    for ((r, c), _) in grid.filled() {
        if seen[r * grid.cols() + c] {
            continue;
        }
        components += 1;
        seen[r * grid.cols() + c] = true;
        let mut queue = VecDeque::from([(r, c)]);

        while let Some((cr, cc)) = queue.pop_front() {
            let Some(mask) = grid.get(cr, cc).and_then(|cell| cell.mask(catalog)) else {
                continue;
            };
            for d in mask.directions() {
                let Some((nr, nc)) = grid.neighbor(cr, cc, d) else {
                    continue;
                };
                let joined = matches!(neighbor_mask(grid, catalog, cr, cc, d), Some(Some(m)) if m.contains(d.opposite()));
                if joined && !seen[nr * grid.cols() + nc] {
                    seen[nr * grid.cols() + nc] = true;
                    queue.push_back((nr, nc));
                }
            }
        }
    }
    components
}
