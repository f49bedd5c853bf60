//! Error types for the simulator

/// Result type alias
pub type Result<T> = std::result::Result<T, SimError>;

/// Simulator error types
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// Step requested without a loaded track raster
    #[error("No track loaded")]
    NoTrack,

    /// Track raster could not be decoded
    #[error("Track load failed: {0}")]
    TrackLoad(String),

    /// Non-finite value reached the kinematics integrator
    #[error("Numeric fault: {0}")]
    NumericFault(String),

    /// Start line endpoints coincide
    #[error("Start line is degenerate (endpoints coincide)")]
    DegenerateStartLine,

    /// Loop generation ran out of attempts
    #[error("Track generation failed after {attempts} attempts")]
    GenerationExhausted {
        /// Attempts made before giving up
        attempts: u32,
    },

    /// Grid cannot hold a closed loop
    #[error("Grid {rows}x{cols} is too small for a loop")]
    GridTooSmall {
        /// Grid rows
        rows: usize,
        /// Grid columns
        cols: usize,
    },

    /// Grid dimensions outside the supported range
    #[error("Grid {rows}x{cols} is outside the supported size")]
    InvalidGridSize {
        /// Grid rows
        rows: usize,
        /// Grid columns
        cols: usize,
    },

    /// Rendered raster would exceed the pixel budget
    #[error("Raster {width}x{height} px is too large")]
    RasterTooLarge {
        /// Width in pixels
        width: u64,
        /// Height in pixels
        height: u64,
    },

    /// Design references a part the catalog doesn't know
    #[error("Unknown track part: {0}")]
    UnknownPart(String),

    /// Design places a part outside its grid
    #[error("Cell ({r}, {c}) is outside the grid")]
    CellOutOfRange {
        /// Row index
        r: usize,
        /// Column index
        c: usize,
    },

    /// Rotation not in {0, 90, 180, 270}
    #[error("Invalid rotation: {0}")]
    InvalidRotation(u16),

    /// External control logic aborted the tick
    #[error("Control error: {0}")]
    Control(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
