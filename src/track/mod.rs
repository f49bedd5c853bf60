//! Track tooling
//!
//! Tile catalog and grid, closed-loop generation, connector validation,
//! rasterization for the sensors and design-file persistence. Nothing here
//! touches a live simulation; callers hand the rendered raster over.

pub mod catalog;
pub mod design;
pub mod generator;
pub mod grid;
pub mod raster;
pub mod validator;

pub use catalog::{ConnectorMask, Direction, Rotation, TrackPart, TrackPartCatalog};
pub use design::{DesignPart, GridSize, TrackDesign};
pub use generator::{DEFAULT_MAX_RETRIES, GeneratedTrack, generate_loop, min_loop_len};
pub use grid::{MAX_GRID_DIM, TrackCell, TrackGrid};
pub use raster::{MAX_RASTER_PIXELS, render_grid, suggest_start_pose};
pub use validator::{ValidationReport, validate};
