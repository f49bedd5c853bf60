//! Simulation context
//!
//! Owns every piece of mutable simulation state. Created at simulation
//! start, reset on demand, dropped on teardown. Only `tick` advances it.

use super::lap::{LapTimer, StartLine};
use super::random::{RandomSource, RngState};
use super::sensors::{self, SensorReadings};
use super::state::{Pose, RobotGeometry, RobotState};
use super::surface::TrackSurface;
use super::tick::{Snapshot, TickInput, tick};
use crate::error::Result;
use crate::settings::SimConfig;

/// Maximum console lines kept from controller `log` calls
pub const CONSOLE_CAPACITY: usize = 200;

pub struct SimulationContext {
    pub(crate) config: SimConfig,
    pub(crate) robot: RobotState,
    pub(crate) surface: TrackSurface,
    pub(crate) lap_timer: LapTimer,
    /// Explicit start line; derived from the start pose when None
    pub(crate) start_line: Option<StartLine>,
    pub(crate) rng: Box<dyn RandomSource>,
    pub(crate) rng_state: RngState,
    pub(crate) sim_time: f32,
    pub(crate) time_ticks: u64,
    pub(crate) out_of_bounds: bool,
    /// Reading taken for the tick about to run
    pub(crate) sensed: Option<(u64, SensorReadings)>,
    console: Vec<String>,
}

impl SimulationContext {
    pub fn new(config: SimConfig, geometry: RobotGeometry, start_pose: Pose, seed: u64) -> Result<Self> {
        let rng_state = RngState::new(seed);
        let robot = RobotState::new(geometry, start_pose);
        let mut lap_timer = LapTimer::new();
        lap_timer.initialize(&robot.start_pose, &robot.geometry, None, 0.0)?;

        Ok(Self {
            config: config.sanitized(),
            robot,
            surface: TrackSurface::empty(),
            lap_timer,
            start_line: None,
            rng: Box::new(rng_state.to_rng()),
            rng_state,
            sim_time: 0.0,
            time_ticks: 0,
            out_of_bounds: false,
            sensed: None,
            console: Vec::new(),
        })
    }

    /// Swap in a different random source (scripted sequences in tests)
    pub fn with_rng(mut self, rng: Box<dyn RandomSource>) -> Self {
        self.rng = rng;
        self
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Replace config between ticks; pose is kept
    pub fn set_config(&mut self, config: SimConfig) {
        self.config = config.sanitized();
        self.sensed = None;
    }

    pub fn robot(&self) -> &RobotState {
        &self.robot
    }

    pub fn surface(&self) -> &TrackSurface {
        &self.surface
    }

    pub fn lap_timer(&self) -> &LapTimer {
        &self.lap_timer
    }

    pub fn sim_time(&self) -> f32 {
        self.sim_time
    }

    pub fn time_ticks(&self) -> u64 {
        self.time_ticks
    }

    pub fn seed(&self) -> u64 {
        self.rng_state.seed
    }

    /// Decode a track raster; the previous track stays on failure
    pub fn load_track(&mut self, bytes: &[u8]) -> Result<()> {
        self.surface.load(bytes)?;
        self.sensed = None;
        Ok(())
    }

    pub fn set_surface(&mut self, surface: TrackSurface) {
        self.surface = surface;
        self.sensed = None;
    }

    /// Replace robot geometry; trail is dropped, pose kept
    pub fn set_geometry(&mut self, geometry: RobotGeometry) -> Result<()> {
        self.robot.set_geometry(geometry);
        self.sensed = None;
        if self.start_line.is_none() {
            self.lap_timer
                .initialize(&self.robot.start_pose, &self.robot.geometry, None, self.sim_time)?;
        }
        Ok(())
    }

    /// Move the start pose and restart from it
    pub fn set_start_pose(&mut self, start_pose: Pose) -> Result<()> {
        self.robot.start_pose = start_pose;
        self.reset()
    }

    /// Use an explicit start line, or derive one from the start pose
    ///
    /// Lap counters restart; side state follows the current pose.
    pub fn set_start_line(&mut self, line: Option<StartLine>) -> Result<()> {
        self.lap_timer
            .initialize(&self.robot.start_pose, &self.robot.geometry, line, self.sim_time)?;
        self.lap_timer.reset(&self.robot.pose, self.sim_time);
        self.start_line = line;
        Ok(())
    }

    /// See `LapTimer::set_require_segment_crossing`; kept across resets
    pub fn set_require_segment_crossing(&mut self, enabled: bool) {
        self.lap_timer.set_require_segment_crossing(enabled);
    }

    /// Back to the start pose with clock, laps, trail and console cleared
    pub fn reset(&mut self) -> Result<()> {
        self.robot.reset();
        self.sim_time = 0.0;
        self.time_ticks = 0;
        self.out_of_bounds = false;
        self.sensed = None;
        self.console.clear();
        self.lap_timer
            .initialize(&self.robot.start_pose, &self.robot.geometry, self.start_line, 0.0)?;
        Ok(())
    }

    /// Sensor reading for the upcoming tick
    ///
    /// Taken from the pose left by the previous tick and cached, so the
    /// control logic and the stepper see the same noisy sample.
    pub fn sense(&mut self) -> SensorReadings {
        if let Some((tick, reading)) = self.sensed {
            if tick == self.time_ticks {
                return reading;
            }
        }
        self.surface.set_line_threshold(self.config.line_threshold);
        self.surface.set_alpha_cutoff(self.config.alpha_cutoff);
        let reading = sensors::sample(
            &self.robot.pose,
            &self.robot.geometry,
            &self.surface,
            self.config.pixels_per_meter,
            self.config.sensor_noise_prob,
            self.rng.as_mut(),
        );
        self.sensed = Some((self.time_ticks, reading));
        reading
    }

    /// Advance one tick with the given motor commands
    pub fn step(&mut self, left_pwm: i32, right_pwm: i32) -> Result<Snapshot> {
        tick(self, &TickInput { left_pwm, right_pwm })
    }

    pub fn console(&self) -> &[String] {
        &self.console
    }

    /// Append a controller log line (oldest lines drop first)
    pub fn push_console(&mut self, line: String) {
        log::info!(target: "robot", "{}", line);
        self.console.push(line);
        if self.console.len() > CONSOLE_CAPACITY {
            let excess = self.console.len() - CONSOLE_CAPACITY;
            self.console.drain(..excess);
        }
    }
}
