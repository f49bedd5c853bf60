//! Line Follower Sim - a two-wheeled line-following robot simulator
//!
//! Core modules:
//! - `sim`: Deterministic simulation (kinematics, line sensors, lap timing)
//! - `track`: Tile catalog, loop generator, validator, rasterizer, design files
//! - `control`: Pluggable controller interface driven by the host tick loop
//! - `settings`: Live-updatable simulation configuration

pub mod control;
pub mod error;
pub mod settings;
pub mod sim;
pub mod track;

pub use error::{Result, SimError};
pub use settings::{NoisePreset, SimConfig};

use glam::Vec2;

/// Simulation configuration constants
pub mod consts {
    /// Default fixed timestep (50 Hz, display-refresh bound)
    pub const SIM_DT: f32 = 0.02;

    /// Raster scale shared by the whole process (1 px = 1 mm)
    pub const PIXELS_PER_METER: f32 = 1000.0;

    /// PWM command range (symmetric)
    pub const PWM_MAX: i32 = 255;

    /// Robot defaults (meters)
    pub const ROBOT_WHEELBASE: f32 = 0.1;
    pub const ROBOT_LENGTH: f32 = 0.15;
    pub const SENSOR_FORWARD_OFFSET: f32 = 0.07;
    pub const SENSOR_LATERAL_SPREAD: f32 = 0.02;
    pub const SENSOR_DIAMETER: f32 = 0.01;

    /// Motor defaults
    pub const MAX_ROBOT_SPEED: f32 = 0.5;
    pub const MOTOR_EFFICIENCY: f32 = 0.85;
    pub const MOTOR_RESPONSE_FACTOR: f32 = 0.25;
    pub const MOTOR_DEADBAND_PWM: i32 = 10;

    /// Raster classification defaults
    pub const LINE_THRESHOLD: u8 = 100;
    pub const ALPHA_CUTOFF: u8 = 32;

    /// Minimum lap duration in sim seconds; faster flips are line bounce
    pub const MIN_LAP_DURATION: f32 = 2.0;

    /// Generated track tiles
    pub const TILE_PX: u32 = 400;
    pub const TRACK_LINE_WIDTH_PX: f32 = 30.0;
}

/// Normalize angle to (-π, π]
#[inline]
pub fn normalize_angle(angle: f32) -> f32 {
    use std::f32::consts::{PI, TAU};
    let a = angle.sin().atan2(angle.cos());
    if a <= -PI { a + TAU } else { a }
}

/// Unit heading vector for an angle
#[inline]
pub fn heading(angle: f32) -> Vec2 {
    Vec2::new(angle.cos(), angle.sin())
}

/// Robot-left unit vector for a heading (raster frame, y down)
#[inline]
pub fn left_of(angle: f32) -> Vec2 {
    Vec2::new(angle.sin(), -angle.cos())
}
