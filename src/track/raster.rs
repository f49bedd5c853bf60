//! Tile grid to track raster
//!
//! Produces the bitmap the line sensors sample: opaque white background,
//! black line centred in each connector edge.

use glam::Vec2;
use image::{Rgba, RgbaImage};

use super::catalog::{ConnectorMask, Direction, TrackPartCatalog};
use super::generator::GeneratedTrack;
use super::grid::TrackGrid;
use crate::error::{Result, SimError};
use crate::sim::state::Pose;

/// Largest raster `render_grid` will allocate
pub const MAX_RASTER_PIXELS: u64 = 1 << 26;

const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);
const LINE: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Line shape inside one tile, in tile-local pixels
#[derive(Debug, Clone, Copy, PartialEq)]
enum TileShape {
    /// Straight band; `vertical` for north-south
    Band { vertical: bool },
    /// Quarter circle of radius tile/2 around a tile corner
    Arc { corner: Vec2 },
    /// Segments from the centre to every connector
    Spokes(ConnectorMask),
}

impl TileShape {
    fn for_mask(mask: ConnectorMask, tile: f32) -> Self {
        let dirs: Vec<Direction> = mask.directions().collect();
        match dirs.as_slice() {
            [a, b] if a.opposite() == *b => TileShape::Band {
                vertical: mask.contains(Direction::North),
            },
            [_, _] => {
                let x = if mask.contains(Direction::East) { tile } else { 0.0 };
                let y = if mask.contains(Direction::South) { tile } else { 0.0 };
                TileShape::Arc { corner: Vec2::new(x, y) }
            }
            _ => TileShape::Spokes(mask),
        }
    }

    fn covers(&self, p: Vec2, tile: f32, half_width: f32) -> bool {
        let mid = tile * 0.5;
        match *self {
            TileShape::Band { vertical: true } => (p.x - mid).abs() < half_width,
            TileShape::Band { vertical: false } => (p.y - mid).abs() < half_width,
            TileShape::Arc { corner } => (p.distance(corner) - mid).abs() < half_width,
            TileShape::Spokes(mask) => {
                let centre = Vec2::splat(mid);
                mask.directions()
                    .any(|d| distance_to_segment(p, centre, edge_midpoint(d, tile)) < half_width)
            }
        }
    }
}

fn edge_midpoint(d: Direction, tile: f32) -> Vec2 {
    let mid = tile * 0.5;
    match d {
        Direction::North => Vec2::new(mid, 0.0),
        Direction::East => Vec2::new(tile, mid),
        Direction::South => Vec2::new(mid, tile),
        Direction::West => Vec2::new(0.0, mid),
    }
}

fn distance_to_segment(p: Vec2, a: Vec2, b: Vec2) -> f32 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq <= f32::EPSILON {
        return p.distance(a);
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    p.distance(a + ab * t)
}

/// Pixel size of the raster for `grid`, if it fits under `MAX_RASTER_PIXELS`
fn raster_size(grid: &TrackGrid, tile_px: u32) -> Result<(u32, u32)> {
    let side = |cells: usize| (cells as u64).saturating_mul(tile_px as u64);
    let (width, height) = (side(grid.cols()), side(grid.rows()));
    let too_large = SimError::RasterTooLarge { width, height };
    if width.checked_mul(height).is_none_or(|area| area > MAX_RASTER_PIXELS) {
        return Err(too_large);
    }
    match (u32::try_from(width), u32::try_from(height)) {
        (Ok(w), Ok(h)) => Ok((w, h)),
        _ => Err(too_large),
    }
}

/// Draw every filled cell; parts the catalog lacks are left blank
pub fn render_grid(
    grid: &TrackGrid,
    catalog: &TrackPartCatalog,
    tile_px: u32,
    line_width_px: f32,
) -> Result<RgbaImage> {
    let (width, height) = raster_size(grid, tile_px).inspect_err(|e| log::warn!("{}", e))?;
    let mut img = RgbaImage::from_pixel(width, height, BACKGROUND);

    let tile = tile_px as f32;
    let half_width = line_width_px * 0.5;

    for ((r, c), cell) in grid.filled() {
        let Some(mask) = cell.mask(catalog) else {
            log::warn!("Skipping unknown part '{}' at ({}, {})", cell.part_id, r, c);
            continue;
        };
        let shape = TileShape::for_mask(mask, tile);
        let x0 = c as u32 * tile_px;
        let y0 = r as u32 * tile_px;
        for ly in 0..tile_px {
            for lx in 0..tile_px {
                if shape.covers(Vec2::new(lx as f32, ly as f32), tile, half_width) {
                    img.put_pixel(x0 + lx, y0 + ly, LINE);
                }
            }
        }
    }

    Ok(img)
}

/// Where to put the robot on a freshly generated loop
///
/// Centre of the first straight cell, heading toward the next loop cell;
/// otherwise the midpoint of the edge between the first two loop cells,
/// heading along the loop.
pub fn suggest_start_pose(track: &GeneratedTrack, tile_px: u32, pixels_per_meter: f32) -> Pose {
    let tile = tile_px as f32 / pixels_per_meter;
    let centre_of = |(r, c): (usize, usize)| Vec2::new((c as f32 + 0.5) * tile, (r as f32 + 0.5) * tile);
    let n = track.path.len();

    let straight = (0..n).find(|&i| {
        let cell = track.path[i];
        let back = Direction::between(cell, track.path[(i + n - 1) % n]);
        let ahead = Direction::between(cell, track.path[(i + 1) % n]);
        matches!((back, ahead), (Some(b), Some(a)) if b.opposite() == a)
    });

    if let Some(i) = straight {
        let cell = track.path[i];
        let next = track.path[(i + 1) % n];
        let angle = Direction::between(cell, next).map_or(0.0, Direction::angle);
        let p = centre_of(cell);
        return Pose::new(p.x, p.y, angle);
    }

    match track.path.as_slice() {
        [first, second, ..] => {
            let p = (centre_of(*first) + centre_of(*second)) * 0.5;
            let angle = Direction::between(*first, *second).map_or(0.0, Direction::angle);
            Pose::new(p.x, p.y, angle)
        }
        [only] => {
            let p = centre_of(*only);
            Pose::new(p.x, p.y, 0.0)
        }
        [] => Pose::new(tile * 0.5, tile * 0.5, 0.0),
    }
}
