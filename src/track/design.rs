//! Track design files
//!
//! JSON record of a hand-edited or generated grid. Parts are referenced by
//! their asset file name so designs survive catalog reordering.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::catalog::{Rotation, TrackPartCatalog};
use super::grid::{TrackCell, TrackGrid};
use crate::error::{Result, SimError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSize {
    pub rows: usize,
    pub cols: usize,
}

/// One placed tile in a design file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignPart {
    pub r: usize,
    pub c: usize,
    pub part_file: String,
    /// Degrees clockwise; kept raw so bad values surface as `InvalidRotation`
    pub rotation: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackDesign {
    pub grid_size: GridSize,
    pub grid_parts: Vec<DesignPart>,
    #[serde(default)]
    pub track_name: String,
}

impl TrackDesign {
    /// Capture a grid; cells with parts the catalog lacks are skipped
    pub fn from_grid(grid: &TrackGrid, catalog: &TrackPartCatalog, name: &str) -> Self {
        let grid_parts = grid
            .filled()
            .filter_map(|((r, c), cell)| match catalog.get(&cell.part_id) {
                Some(part) => Some(DesignPart {
                    r,
                    c,
                    part_file: part.file.clone(),
                    rotation: cell.rotation.degrees(),
                }),
                None => {
                    log::warn!("Not saving unknown part '{}' at ({}, {})", cell.part_id, r, c);
                    None
                }
            })
            .collect();

        Self {
            grid_size: GridSize {
                rows: grid.rows(),
                cols: grid.cols(),
            },
            grid_parts,
            track_name: name.to_string(),
        }
    }

    /// Rebuild the grid, rejecting anything that would leave it inconsistent
    pub fn to_grid(&self, catalog: &TrackPartCatalog) -> Result<TrackGrid> {
        let GridSize { rows, cols } = self.grid_size;
        let mut grid = TrackGrid::new(rows, cols).inspect_err(|_| {
            log::warn!("Design '{}' has unsupported grid size {}x{}", self.track_name, rows, cols);
        })?;
        for entry in &self.grid_parts {
            let Some(part) = catalog.find_by_file(&entry.part_file) else {
                log::warn!(
                    "Design '{}' references unknown part '{}' at ({}, {})",
                    self.track_name,
                    entry.part_file,
                    entry.r,
                    entry.c
                );
                return Err(SimError::UnknownPart(entry.part_file.clone()));
            };
            let rotation = Rotation::from_degrees(entry.rotation)?;
            grid.set(entry.r, entry.c, Some(TrackCell::new(&part.id, rotation)))?;
        }
        Ok(grid)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path.as_ref(), self.to_json()?)?;
        log::info!("Saved track design '{}' to {}", self.track_name, path.as_ref().display());
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}
