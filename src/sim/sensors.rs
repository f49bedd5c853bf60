//! Line sensor model
//!
//! Three reflectance sensors on a bar ahead of the axle. Positions are a
//! rigid transform of the pose, scaled to raster pixels and rounded to
//! the nearest pixel before classification.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::random::RandomSource;
use super::state::{Pose, RobotGeometry};
use super::surface::TrackSurface;
use crate::left_of;

/// Sensor identifiers, left to right
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SensorId {
    Left,
    Center,
    Right,
}

impl SensorId {
    pub const ALL: [SensorId; 3] = [SensorId::Left, SensorId::Center, SensorId::Right];
}

/// One tick's sensor states (true = on line)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SensorReadings {
    pub left: bool,
    pub center: bool,
    pub right: bool,
}

impl SensorReadings {
    pub fn get(&self, id: SensorId) -> bool {
        match id {
            SensorId::Left => self.left,
            SensorId::Center => self.center,
            SensorId::Right => self.right,
        }
    }

    /// Embedded convention: 0 = on line, 1 = off line
    pub fn digital(&self, id: SensorId) -> u8 {
        if self.get(id) { 0 } else { 1 }
    }

    fn flip(&mut self, id: SensorId) {
        match id {
            SensorId::Left => self.left = !self.left,
            SensorId::Center => self.center = !self.center,
            SensorId::Right => self.right = !self.right,
        }
    }
}

/// World positions (meters) of the left, center and right sensors
pub fn sensor_positions(pose: &Pose, geometry: &RobotGeometry) -> [Vec2; 3] {
    let center = pose.position() + pose.forward() * geometry.sensor_forward_offset;
    let lateral = left_of(pose.angle) * geometry.sensor_lateral_spread;
    [center + lateral, center, center - lateral]
}

/// Meters to the nearest raster pixel
#[inline]
pub fn to_pixel(p: Vec2, pixels_per_meter: f32) -> (i64, i64) {
    let s = p * pixels_per_meter;
    (s.x.round() as i64, s.y.round() as i64)
}

/// Sample all sensors, flipping each independently with `noise_prob`
pub fn sample(
    pose: &Pose,
    geometry: &RobotGeometry,
    surface: &TrackSurface,
    pixels_per_meter: f32,
    noise_prob: f32,
    rng: &mut dyn RandomSource,
) -> SensorReadings {
    let [l, c, r] = sensor_positions(pose, geometry).map(|p| {
        let (px, py) = to_pixel(p, pixels_per_meter);
        surface.is_on_line(px, py)
    });
    let mut readings = SensorReadings {
        left: l,
        center: c,
        right: r,
    };

    if noise_prob > 0.0 {
        for id in SensorId::ALL {
            if rng.chance(noise_prob) {
                readings.flip(id);
            }
        }
    }
    readings
}
