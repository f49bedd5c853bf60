//! Lap timing with start/finish line crossing detection
//!
//! The side of the start line is the sign of the 2D cross product
//! `(y - y1)(x2 - x1) - (x - x1)(y2 - y1)`, recomputed every update. Any
//! sign flip between consecutive updates is a crossing; it completes a lap
//! only once the current lap has run longer than the minimum duration.
//! Faster flips are bounce near the line: side state follows them but
//! nothing is counted.
//!
//! Hosts whose start line is short relative to the track can opt in to
//! `require_segment_crossing`, which also ignores flips where the movement
//! passes the line's infinite extension outside the segment.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::state::{Pose, RobotGeometry};
use crate::consts::MIN_LAP_DURATION;
use crate::error::{Result, SimError};
use crate::left_of;

/// Start line half-length relative to the larger robot dimension
const START_LINE_HALF_SPAN: f32 = 1.5;

/// Start/finish segment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StartLine {
    pub p1: Vec2,
    pub p2: Vec2,
}

impl StartLine {
    pub fn new(p1: Vec2, p2: Vec2) -> Result<Self> {
        if !(p1.is_finite() && p2.is_finite()) || p1.distance_squared(p2) <= f32::EPSILON * f32::EPSILON {
            return Err(SimError::DegenerateStartLine);
        }
        Ok(Self { p1, p2 })
    }

    /// Line perpendicular to the heading, centered just behind the robot
    pub fn behind(pose: &Pose, geometry: &RobotGeometry) -> Result<Self> {
        let center = pose.position() - pose.forward() * (geometry.length / 2.0);
        let half = geometry.bounds_margin().max(0.01) * START_LINE_HALF_SPAN;
        let across = left_of(pose.angle) * half;
        Self::new(center + across, center - across)
    }

    /// Signed side value of a point
    #[inline]
    pub fn side_value(&self, p: Vec2) -> f32 {
        (p.y - self.p1.y) * (self.p2.x - self.p1.x) - (p.x - self.p1.x) * (self.p2.y - self.p1.y)
    }

    #[inline]
    pub fn is_positive_side(&self, p: Vec2) -> bool {
        self.side_value(p) > 0.0
    }

    /// Whether the step `from -> to` meets the line within the segment
    fn step_within_segment(&self, from: Vec2, to: Vec2) -> bool {
        let d_from = self.side_value(from);
        let d_to = self.side_value(to);
        let denom = d_from - d_to;
        let hit = if denom.abs() > f32::EPSILON {
            from + (to - from) * (d_from / denom)
        } else {
            to
        };
        let dir = self.p2 - self.p1;
        let t = (hit - self.p1).dot(dir) / dir.length_squared();
        (0.0..=1.0).contains(&t)
    }
}

/// Lap counters (times in sim seconds)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LapRecord {
    pub lap_count: u32,
    pub last_lap_time: Option<f32>,
    pub best_lap_time: Option<f32>,
    pub current_lap_start_time: f32,
}

/// Lap record plus the running lap
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LapDisplay {
    pub record: LapRecord,
    pub current_lap_time: f32,
}

/// Outcome of one update
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LapEvent {
    pub crossed: bool,
    pub lap_time: Option<f32>,
}

/// Lap timer state machine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LapTimer {
    line: Option<StartLine>,
    on_positive_side: bool,
    last_position: Vec2,
    record: LapRecord,
    min_lap_duration: f32,
    #[serde(default)]
    segment_only: bool,
}

impl Default for LapTimer {
    fn default() -> Self {
        Self {
            line: None,
            on_positive_side: false,
            last_position: Vec2::ZERO,
            record: LapRecord::default(),
            min_lap_duration: MIN_LAP_DURATION,
            segment_only: false,
        }
    }
}

impl LapTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the timer at the start pose
    ///
    /// Without an explicit line, one is derived behind the robot.
    pub fn initialize(
        &mut self,
        start_pose: &Pose,
        geometry: &RobotGeometry,
        start_line: Option<StartLine>,
        now: f32,
    ) -> Result<()> {
        let line = match start_line {
            Some(line) => StartLine::new(line.p1, line.p2)?,
            None => StartLine::behind(start_pose, geometry)?,
        };
        let pos = start_pose.position();
        self.line = Some(line);
        self.on_positive_side = line.is_positive_side(pos);
        self.last_position = pos;
        self.record = LapRecord {
            current_lap_start_time: now,
            ..LapRecord::default()
        };
        Ok(())
    }

    pub fn set_min_lap_duration(&mut self, seconds: f32) {
        self.min_lap_duration = seconds.max(0.0);
    }

    /// Only count flips whose movement meets the line inside the segment
    pub fn set_require_segment_crossing(&mut self, enabled: bool) {
        self.segment_only = enabled;
    }

    pub fn requires_segment_crossing(&self) -> bool {
        self.segment_only
    }

    pub fn start_line(&self) -> Option<StartLine> {
        self.line
    }

    pub fn record(&self) -> LapRecord {
        self.record
    }

    /// Feed the pose after a tick
    pub fn update(&mut self, pose: &Pose, now: f32) -> LapEvent {
        let Some(line) = self.line else {
            return LapEvent::default();
        };
        let pos = pose.position();
        let side = line.is_positive_side(pos);
        let prev = self.last_position;
        self.last_position = pos;

        if side == self.on_positive_side {
            return LapEvent::default();
        }
        self.on_positive_side = side;

        if self.segment_only && !line.step_within_segment(prev, pos) {
            log::trace!("Side flip outside start segment at ({:.3}, {:.3})", pos.x, pos.y);
            return LapEvent::default();
        }

        let elapsed = now - self.record.current_lap_start_time;
        if elapsed <= self.min_lap_duration {
            log::debug!("Ignored start line bounce after {:.3}s", elapsed);
            return LapEvent::default();
        }

        let rec = &mut self.record;
        rec.lap_count += 1;
        rec.last_lap_time = Some(elapsed);
        if rec.best_lap_time.is_none_or(|best| elapsed < best) {
            rec.best_lap_time = Some(elapsed);
        }
        rec.current_lap_start_time = now;
        log::info!("Lap {} completed in {:.3}s", rec.lap_count, elapsed);

        LapEvent {
            crossed: true,
            lap_time: Some(elapsed),
        }
    }

    pub fn display(&self, now: f32) -> LapDisplay {
        LapDisplay {
            record: self.record,
            current_lap_time: (now - self.record.current_lap_start_time).max(0.0),
        }
    }

    /// Clear counters, keeping the line
    pub fn reset(&mut self, pose: &Pose, now: f32) {
        self.record = LapRecord {
            current_lap_start_time: now,
            ..LapRecord::default()
        };
        self.last_position = pose.position();
        if let Some(line) = self.line {
            self.on_positive_side = line.is_positive_side(self.last_position);
        }
    }
}
