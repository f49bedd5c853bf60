//! Robot state and core simulation types
//!
//! World frame is the raster frame scaled to meters: x right, y down,
//! angle measured from +x toward +y.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::{heading, normalize_angle};

/// Robot pose (meters, radians in (-π, π])
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    pub x: f32,
    pub y: f32,
    pub angle: f32,
}

impl Pose {
    pub fn new(x: f32, y: f32, angle: f32) -> Self {
        Self {
            x,
            y,
            angle: normalize_angle(angle),
        }
    }

    #[inline]
    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    /// Unit vector along the heading
    #[inline]
    pub fn forward(&self) -> Vec2 {
        heading(self.angle)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.angle.is_finite()
    }
}

/// Robot dimensions and sensor placement (meters)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RobotGeometry {
    /// Distance between wheel contact points
    pub wheelbase: f32,
    /// Body length along the heading
    pub length: f32,
    /// Center sensor distance ahead of the axle midpoint
    pub sensor_forward_offset: f32,
    /// Left/right sensor distance from the center sensor
    pub sensor_lateral_spread: f32,
    /// Sensor footprint (rendering only)
    pub sensor_diameter: f32,
}

impl Default for RobotGeometry {
    fn default() -> Self {
        Self {
            wheelbase: ROBOT_WHEELBASE,
            length: ROBOT_LENGTH,
            sensor_forward_offset: SENSOR_FORWARD_OFFSET,
            sensor_lateral_spread: SENSOR_LATERAL_SPREAD,
            sensor_diameter: SENSOR_DIAMETER,
        }
    }
}

impl RobotGeometry {
    /// Negative lengths are treated as zero
    pub fn sanitized(&self) -> Self {
        let fix = |v: f32| if v.is_finite() { v.max(0.0) } else { 0.0 };
        Self {
            wheelbase: fix(self.wheelbase),
            length: fix(self.length),
            sensor_forward_offset: fix(self.sensor_forward_offset),
            sensor_lateral_spread: fix(self.sensor_lateral_spread),
            sensor_diameter: fix(self.sensor_diameter),
        }
    }

    /// Bounds-check margin around the pose
    pub fn bounds_margin(&self) -> f32 {
        self.length.max(self.wheelbase)
    }
}

/// Motor commands and lagged wheel speeds
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ActuatorState {
    /// Commanded PWM from control logic (-255..=255)
    pub commanded_left_pwm: i32,
    pub commanded_right_pwm: i32,
    /// Wheel speeds after lag and clamping (m/s)
    pub applied_left_speed: f32,
    pub applied_right_speed: f32,
}

impl ActuatorState {
    pub fn applied(&self) -> (f32, f32) {
        (self.applied_left_speed, self.applied_right_speed)
    }
}

/// Trail point for rendering
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TrailPoint {
    pub pos: Vec2,
    pub speed: f32,
}

/// Maximum number of trail points to store
pub const TRAIL_LENGTH: usize = 600;

/// The simulated robot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RobotState {
    pub pose: Pose,
    /// Pose restored by reset
    pub start_pose: Pose,
    pub geometry: RobotGeometry,
    pub actuators: ActuatorState,
    /// Trail history for rendering (newest first)
    #[serde(skip)]
    pub trail: Vec<TrailPoint>,
}

impl RobotState {
    pub fn new(geometry: RobotGeometry, start_pose: Pose) -> Self {
        Self {
            pose: start_pose,
            start_pose,
            geometry: geometry.sanitized(),
            actuators: ActuatorState::default(),
            trail: Vec::with_capacity(TRAIL_LENGTH),
        }
    }

    /// Replace geometry; keeps pose, drops trail
    pub fn set_geometry(&mut self, geometry: RobotGeometry) {
        self.geometry = geometry.sanitized();
        self.clear_trail();
    }

    /// Record current position to trail (call each tick)
    pub fn record_trail(&mut self) {
        let (l, r) = self.actuators.applied();
        let speed = (l + r) / 2.0;
        self.trail.insert(0, TrailPoint { pos: self.pose.position(), speed });
        if self.trail.len() > TRAIL_LENGTH {
            self.trail.pop();
        }
    }

    pub fn clear_trail(&mut self) {
        self.trail.clear();
    }

    /// Back to the start pose with motors stopped
    pub fn reset(&mut self) {
        self.pose = self.start_pose;
        self.actuators = ActuatorState::default();
        self.clear_trail();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pose_new_normalizes() {
        let pose = Pose::new(0.0, 0.0, 3.0 * std::f32::consts::PI);
        assert!((pose.angle - std::f32::consts::PI).abs() < 1e-5);
    }

    #[test]
    fn test_geometry_replacement_keeps_pose() {
        let mut robot = RobotState::new(RobotGeometry::default(), Pose::new(0.5, 0.5, 0.0));
        robot.pose = Pose::new(1.0, 2.0, 0.3);
        robot.record_trail();
        robot.record_trail();
        assert_eq!(robot.trail.len(), 2);

        robot.set_geometry(RobotGeometry {
            wheelbase: 0.2,
            ..Default::default()
        });
        assert!(robot.trail.is_empty());
        assert_eq!(robot.pose, Pose::new(1.0, 2.0, 0.3));
        assert_eq!(robot.geometry.wheelbase, 0.2);
    }

    #[test]
    fn test_trail_is_bounded() {
        let mut robot = RobotState::new(RobotGeometry::default(), Pose::default());
        for _ in 0..TRAIL_LENGTH + 10 {
            robot.record_trail();
        }
        assert_eq!(robot.trail.len(), TRAIL_LENGTH);
    }

    #[test]
    fn test_negative_geometry_sanitized() {
        let geometry = RobotGeometry {
            wheelbase: -0.1,
            length: f32::NAN,
            ..Default::default()
        }
        .sanitized();
        assert_eq!(geometry.wheelbase, 0.0);
        assert_eq!(geometry.length, 0.0);
    }

    #[test]
    fn test_reset_restores_start() {
        let mut robot = RobotState::new(RobotGeometry::default(), Pose::new(0.3, 0.4, 1.0));
        robot.pose = Pose::new(2.0, 2.0, -1.0);
        robot.actuators.applied_left_speed = 0.3;
        robot.reset();
        assert_eq!(robot.pose, robot.start_pose);
        assert_eq!(robot.actuators, ActuatorState::default());
    }
}
