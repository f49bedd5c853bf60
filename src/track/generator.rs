//! Random closed-loop track generation
//!
//! A randomized depth-first walk looks for a cycle through grid-adjacent
//! cells, then every path cell is tiled with a pass-through part whose
//! rotated connectors match exactly. Any failure discards the grid and the
//! whole attempt starts over.

use serde::{Deserialize, Serialize};

use super::catalog::{ConnectorMask, Direction, Rotation, TrackPart, TrackPartCatalog};
use super::grid::{TrackCell, TrackGrid};
use crate::error::{Result, SimError};
use crate::sim::random::RandomSource;

/// Attempts used by the binary when none are given
pub const DEFAULT_MAX_RETRIES: u32 = 100;

/// Backtracks allowed per attempt, per grid cell
const BACKTRACKS_PER_CELL: usize = 8;

/// A successfully generated loop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedTrack {
    pub grid: TrackGrid,
    /// Cells in driving order; the last one connects back to the first
    pub path: Vec<(usize, usize)>,
}

/// Generate a closed loop of pass-through tiles
///
/// Never returns a partially tiled grid: either every path cell carries a
/// matching part or the call fails with `GenerationExhausted`.
pub fn generate_loop<R: RandomSource>(
    rows: usize,
    cols: usize,
    catalog: &TrackPartCatalog,
    max_retries: u32,
    rng: &mut R,
) -> Result<GeneratedTrack> {
    if rows < 2 || cols < 2 {
        return Err(SimError::GridTooSmall { rows, cols });
    }

    let empty = TrackGrid::new(rows, cols)?;
    let parts: Vec<&TrackPart> = catalog.pass_through_parts().collect();

    for attempt in 1..=max_retries {
        let Some(path) = search_cycle(&empty, rng) else {
            log::debug!("Generation attempt {}: walk could not close a loop", attempt);
            continue;
        };
        match tile_path(&empty, &path, &parts, rng) {
            Some(grid) => {
                log::info!(
                    "Generated {}x{} loop of {} tiles on attempt {}",
                    rows,
                    cols,
                    path.len(),
                    attempt
                );
                return Ok(GeneratedTrack { grid, path });
            }
            None => {
                log::debug!("Generation attempt {}: no part fits the loop", attempt);
            }
        }
    }

    log::warn!("Track generation gave up after {} attempts", max_retries);
    Err(SimError::GenerationExhausted {
        attempts: max_retries,
    })
}

/// Shortest loop accepted for a grid of this size
pub fn min_loop_len(rows: usize, cols: usize) -> usize {
    let area = rows.saturating_mul(cols);
    (area / 3).max(4).min(area)
}

/// Randomized DFS for a cycle through the start cell
fn search_cycle<R: RandomSource>(lattice: &TrackGrid, rng: &mut R) -> Option<Vec<(usize, usize)>> {
    let (rows, cols) = (lattice.rows(), lattice.cols());
    let area = rows * cols;
    let min_len = min_loop_len(rows, cols);
    let target_len = min_len + rng.index(area - min_len + 1);

    let start = (rng.index(rows), rng.index(cols));
    let mut visited = vec![false; area];
    visited[start.0 * cols + start.1] = true;
    let mut path = vec![start];
    let mut options = vec![shuffled_directions(rng)];
    let mut backtracks_left = area * BACKTRACKS_PER_CELL;

    loop {
        let current = *path.last()?;
        let can_close = path.len() >= min_len && Direction::between(current, start).is_some();
        if can_close && path.len() >= target_len {
            return Some(path);
        }

        let mut next = None;
        while let Some(d) = options.last_mut()?.pop() {
            if let Some((nr, nc)) = lattice.neighbor(current.0, current.1, d) {
                if !visited[nr * cols + nc] {
                    next = Some((nr, nc));
                    break;
                }
            }
        }

        match next {
            Some(cell) => {
                visited[cell.0 * cols + cell.1] = true;
                path.push(cell);
                options.push(shuffled_directions(rng));
            }
            None if can_close => return Some(path),
            None => {
                if backtracks_left == 0 || path.len() == 1 {
                    return None;
                }
                backtracks_left -= 1;
                let (r, c) = path.pop()?;
                visited[r * cols + c] = false;
                options.pop();
            }
        }
    }
}

fn shuffled_directions<R: RandomSource>(rng: &mut R) -> Vec<Direction> {
    let mut dirs = Direction::ALL.to_vec();
    rng.shuffle(&mut dirs);
    dirs
}

/// Place a part on every loop cell, or None if some cell has no match
fn tile_path<R: RandomSource>(
    empty: &TrackGrid,
    path: &[(usize, usize)],
    parts: &[&TrackPart],
    rng: &mut R,
) -> Option<TrackGrid> {
    let mut order = parts.to_vec();
    rng.shuffle(&mut order);

    let mut grid = empty.clone();
    let n = path.len();
    for (i, &cell) in path.iter().enumerate() {
        let prev = path[(i + n - 1) % n];
        let next = path[(i + 1) % n];
        let required = ConnectorMask::of(&[Direction::between(cell, prev)?, Direction::between(cell, next)?]);
        let (part, rotation) = match_part(&order, required)?;
        grid.set(cell.0, cell.1, Some(TrackCell::new(&part.id, rotation))).ok()?;
    }
    Some(grid)
}

/// First part (in the given order) whose rotated mask equals `required`
fn match_part<'a>(parts: &[&'a TrackPart], required: ConnectorMask) -> Option<(&'a TrackPart, Rotation)> {
    parts.iter().find_map(|&part| {
        Rotation::ALL
            .into_iter()
            .find(|&r| part.mask_at(r) == required)
            .map(|r| (part, r))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::random::RngState;
    use crate::track::validator::validate;
    use proptest::prelude::*;

    fn loop_only_catalog() -> TrackPartCatalog {
        use Direction::*;
        TrackPartCatalog::new(vec![
            TrackPart::new("straight", "straight.png", "Straight", &[North, South]),
            TrackPart::new("corner", "corner.png", "Corner", &[North, East]),
        ])
    }

    #[test]
    fn test_grid_too_small() {
        let mut rng = RngState::new(1).to_rng();
        let err = generate_loop(1, 5, &TrackPartCatalog::standard(), 10, &mut rng);
        assert!(matches!(err, Err(SimError::GridTooSmall { rows: 1, cols: 5 })));
    }

    #[test]
    fn test_oversized_grid_rejected() {
        let mut rng = RngState::new(1).to_rng();
        let err = generate_loop(usize::MAX, 3, &TrackPartCatalog::standard(), 10, &mut rng);
        assert!(matches!(err, Err(SimError::InvalidGridSize { .. })));
        assert_eq!(min_loop_len(usize::MAX, usize::MAX), usize::MAX / 3);
    }

    #[test]
    fn test_two_by_two_is_a_ring() {
        let mut rng = RngState::new(3).to_rng();
        let track = generate_loop(2, 2, &loop_only_catalog(), 5, &mut rng).unwrap();
        assert_eq!(track.path.len(), 4);
        assert_eq!(track.grid.filled_count(), 4);
        assert!(track.grid.filled().all(|(_, cell)| cell.part_id == "corner"));
    }

    #[test]
    fn test_three_by_three_never_returns_mismatches() {
        let catalog = loop_only_catalog();
        for seed in 0..50 {
            let mut rng = RngState::new(seed).to_rng();
            match generate_loop(3, 3, &catalog, 20, &mut rng) {
                Ok(track) => {
                    let report = validate(&track.grid, &catalog);
                    assert_eq!(report.connection_mismatches, 0, "seed {seed}");
                    assert_eq!(report.dangling_connections, 0, "seed {seed}");
                }
                Err(e) => assert!(matches!(e, SimError::GenerationExhausted { attempts: 20 })),
            }
        }
    }

    #[test]
    fn test_no_pass_through_parts_exhausts() {
        use Direction::*;
        let catalog = TrackPartCatalog::new(vec![TrackPart::new(
            "cross",
            "cross.png",
            "Crossing",
            &[North, East, South, West],
        )]);
        let mut rng = RngState::new(9).to_rng();
        let err = generate_loop(4, 4, &catalog, 3, &mut rng);
        assert!(matches!(err, Err(SimError::GenerationExhausted { attempts: 3 })));
    }

    #[test]
    fn test_zero_retries_fails() {
        let mut rng = RngState::new(9).to_rng();
        let err = generate_loop(4, 4, &TrackPartCatalog::standard(), 0, &mut rng);
        assert!(matches!(err, Err(SimError::GenerationExhausted { attempts: 0 })));
    }

    #[test]
    fn test_same_seed_same_track() {
        let catalog = TrackPartCatalog::standard();
        let a = generate_loop(5, 6, &catalog, 50, &mut RngState::new(77).to_rng()).unwrap();
        let b = generate_loop(5, 6, &catalog, 50, &mut RngState::new(77).to_rng()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_min_loop_len_scales_with_area() {
        assert_eq!(min_loop_len(2, 2), 4);
        assert_eq!(min_loop_len(3, 3), 4);
        assert_eq!(min_loop_len(6, 6), 12);
    }

    proptest! {
        #[test]
        fn generated_loops_validate(seed in any::<u64>(), rows in 2usize..7, cols in 2usize..7) {
            let catalog = TrackPartCatalog::standard();
            let mut rng = RngState::new(seed).to_rng();
            if let Ok(track) = generate_loop(rows, cols, &catalog, 30, &mut rng) {
                let report = validate(&track.grid, &catalog);
                prop_assert!(report.is_valid());
                prop_assert_eq!(report.components, 1);
                prop_assert_eq!(report.filled_cells, track.path.len());
                prop_assert!(track.path.len() >= min_loop_len(rows, cols));
            }
        }
    }
}
