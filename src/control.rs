//! Pluggable robot control logic
//!
//! A `Controller` gets `setup` once and `run_loop` once per tick, talking
//! to the robot only through the `ControlIo` capability set. The host runs
//! the controller to completion (including any requested delay) before the
//! tick's motor commands reach the physics step.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::consts::PWM_MAX;
use crate::error::{Result, SimError};
use crate::sim::{SensorId, SensorReadings, SimulationContext, Snapshot};

/// Motor identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MotorId {
    Left,
    Right,
}

/// Everything a controller may do to the robot
pub trait ControlIo {
    /// 0 = on line, 1 = off line
    fn read_sensor(&mut self, id: SensorId) -> u8;
    /// PWM command, clamped to ±255; held until written again
    fn write_motor(&mut self, id: MotorId, pwm: i32);
    /// Request a simulated delay before the next tick
    fn sleep(&mut self, duration: Duration);
    /// Append a line to the console
    fn log(&mut self, message: &str);
}

/// External control strategy
pub trait Controller {
    fn setup(&mut self, _io: &mut dyn ControlIo) -> Result<()> {
        Ok(())
    }

    fn run_loop(&mut self, io: &mut dyn ControlIo) -> Result<()>;
}

/// What one host tick produced
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    pub snapshot: Snapshot,
    /// Total delay the controller requested during this tick
    pub delay: Duration,
}

/// Staged side effects of one controller call; discarded on failure
struct TickIo {
    readings: SensorReadings,
    motors: (i32, i32),
    delay: Duration,
    console: Vec<String>,
}

impl ControlIo for TickIo {
    fn read_sensor(&mut self, id: SensorId) -> u8 {
        self.readings.digital(id)
    }

    fn write_motor(&mut self, id: MotorId, pwm: i32) {
        let pwm = pwm.clamp(-PWM_MAX, PWM_MAX);
        match id {
            MotorId::Left => self.motors.0 = pwm,
            MotorId::Right => self.motors.1 = pwm,
        }
    }

    fn sleep(&mut self, duration: Duration) {
        self.delay += duration;
    }

    fn log(&mut self, message: &str) {
        self.console.push(message.to_string());
    }
}

/// Drives a controller against a simulation context, one tick per call
pub struct ControlHost<C> {
    controller: C,
    setup_done: bool,
    motors: (i32, i32),
}

impl<C: Controller> ControlHost<C> {
    pub fn new(controller: C) -> Self {
        Self {
            controller,
            setup_done: false,
            motors: (0, 0),
        }
    }

    pub fn controller(&self) -> &C {
        &self.controller
    }

    /// Last committed (left, right) PWM
    pub fn motors(&self) -> (i32, i32) {
        self.motors
    }

    /// Start over: setup runs again and motors stop
    pub fn reset(&mut self) {
        self.setup_done = false;
        self.motors = (0, 0);
    }

    /// Sense, run the controller, step with its outputs, then commit them
    ///
    /// A controller error skips the step. Either failure commits nothing:
    /// motors, setup state and console stay as they were, and the caller
    /// should stop issuing ticks.
    pub fn run_tick(&mut self, ctx: &mut SimulationContext) -> Result<TickReport> {
        if !ctx.surface().is_loaded() {
            return Err(SimError::NoTrack);
        }

        let mut io = TickIo {
            readings: ctx.sense(),
            motors: self.motors,
            delay: Duration::ZERO,
            console: Vec::new(),
        };

        if !self.setup_done {
            self.controller.setup(&mut io).inspect_err(|e| log::warn!("Controller setup failed: {}", e))?;
        }
        self.controller
            .run_loop(&mut io)
            .inspect_err(|e| log::warn!("Controller loop failed at tick {}: {}", ctx.time_ticks(), e))?;

        let snapshot = ctx.step(io.motors.0, io.motors.1)?;

        self.setup_done = true;
        self.motors = io.motors;
        for line in io.console {
            ctx.push_console(line);
        }
        Ok(TickReport {
            snapshot,
            delay: io.delay,
        })
    }
}

/// Which way the line was last seen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum LastSeen {
    #[default]
    Ahead,
    Left,
    Right,
}

/// Three-sensor bang-bang line follower
#[derive(Debug, Clone)]
pub struct LineFollower {
    /// PWM on both wheels when centred
    pub base_pwm: i32,
    /// PWM on the inner wheel while correcting
    pub turn_pwm: i32,
    last_seen: LastSeen,
}

impl Default for LineFollower {
    fn default() -> Self {
        Self::new(120, 30)
    }
}

impl LineFollower {
    pub fn new(base_pwm: i32, turn_pwm: i32) -> Self {
        Self {
            base_pwm,
            turn_pwm,
            last_seen: LastSeen::Ahead,
        }
    }

    fn drive(&self, io: &mut dyn ControlIo, left: i32, right: i32) {
        io.write_motor(MotorId::Left, left);
        io.write_motor(MotorId::Right, right);
    }
}

impl Controller for LineFollower {
    fn setup(&mut self, io: &mut dyn ControlIo) -> Result<()> {
        self.last_seen = LastSeen::Ahead;
        io.log(&format!("line follower ready (base {}, turn {})", self.base_pwm, self.turn_pwm));
        Ok(())
    }

    fn run_loop(&mut self, io: &mut dyn ControlIo) -> Result<()> {
        let left = io.read_sensor(SensorId::Left) == 0;
        let center = io.read_sensor(SensorId::Center) == 0;
        let right = io.read_sensor(SensorId::Right) == 0;

        if left && !right {
            self.last_seen = LastSeen::Left;
        } else if right && !left {
            self.last_seen = LastSeen::Right;
        } else if center {
            self.last_seen = LastSeen::Ahead;
        }

        // Turning toward the robot's left needs the right wheel faster
        match (center, self.last_seen) {
            (true, LastSeen::Ahead) => self.drive(io, self.base_pwm, self.base_pwm),
            (_, LastSeen::Left) => self.drive(io, self.turn_pwm, self.base_pwm),
            (_, LastSeen::Right) => self.drive(io, self.base_pwm, self.turn_pwm),
            (false, LastSeen::Ahead) => self.drive(io, self.turn_pwm, self.turn_pwm),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::SimConfig;
    use crate::sim::{Pose, RobotGeometry, TrackSurface};
    use image::{Rgba, RgbaImage};

    /// 1 m square, black band along y = 0.5 m
    fn band_context() -> SimulationContext {
        let mut ctx = SimulationContext::new(
            SimConfig::default(),
            RobotGeometry::default(),
            Pose::new(0.3, 0.5, 0.0),
            5,
        )
        .unwrap();
        ctx.set_surface(TrackSurface::from_image(RgbaImage::from_fn(1000, 1000, |_, y| {
            if (y as i32 - 500).abs() < 15 {
                Rgba([0, 0, 0, 255])
            } else {
                Rgba([255, 255, 255, 255])
            }
        })));
        ctx
    }

    /// Records calls and plays back a fixed script
    #[derive(Default)]
    struct Scripted {
        setups: u32,
        loops: u32,
        fail_on_loop: Option<u32>,
        seen_center: Vec<u8>,
    }

    impl Controller for Scripted {
        fn setup(&mut self, io: &mut dyn ControlIo) -> Result<()> {
            self.setups += 1;
            io.log("setup");
            Ok(())
        }

        fn run_loop(&mut self, io: &mut dyn ControlIo) -> Result<()> {
            self.loops += 1;
            self.seen_center.push(io.read_sensor(SensorId::Center));
            io.write_motor(MotorId::Left, 900);
            io.write_motor(MotorId::Right, 100);
            io.sleep(Duration::from_millis(5));
            io.sleep(Duration::from_millis(10));
            if self.fail_on_loop == Some(self.loops) {
                return Err(SimError::Control("bad instruction".into()));
            }
            Ok(())
        }
    }

    #[test]
    fn test_setup_once_then_loop_each_tick() {
        let mut ctx = band_context();
        let mut host = ControlHost::new(Scripted::default());
        for _ in 0..3 {
            host.run_tick(&mut ctx).unwrap();
        }
        assert_eq!(host.controller().setups, 1);
        assert_eq!(host.controller().loops, 3);
        assert_eq!(ctx.time_ticks(), 3);
        assert_eq!(ctx.console(), ["setup"]);
    }

    #[test]
    fn test_outputs_clamped_and_delay_summed() {
        let mut ctx = band_context();
        let mut host = ControlHost::new(Scripted::default());
        let report = host.run_tick(&mut ctx).unwrap();
        assert_eq!(host.motors(), (255, 100));
        assert_eq!(ctx.robot().actuators.commanded_left_pwm, 255);
        assert_eq!(report.delay, Duration::from_millis(15));
        assert_eq!(report.snapshot.tick, 1);
    }

    #[test]
    fn test_controller_sees_stepper_reading() {
        let mut ctx = band_context();
        let mut host = ControlHost::new(Scripted::default());
        let report = host.run_tick(&mut ctx).unwrap();
        assert_eq!(host.controller().seen_center, [0]);
        assert!(report.snapshot.sensors.center);
    }

    #[test]
    fn test_failed_loop_leaves_state_intact() {
        let mut ctx = band_context();
        let mut host = ControlHost::new(Scripted {
            fail_on_loop: Some(2),
            ..Default::default()
        });
        host.run_tick(&mut ctx).unwrap();
        let pose = ctx.robot().pose;
        let motors = host.motors();

        let err = host.run_tick(&mut ctx);
        assert!(matches!(err, Err(SimError::Control(_))));
        assert_eq!(ctx.robot().pose, pose);
        assert_eq!(ctx.time_ticks(), 1);
        assert_eq!(host.motors(), motors);
    }

    #[test]
    fn test_failed_step_commits_nothing() {
        let mut ctx = band_context();
        ctx.config.dt = f32::NAN;
        let mut host = ControlHost::new(Scripted::default());

        let err = host.run_tick(&mut ctx);
        assert!(matches!(err, Err(SimError::NumericFault(_))));
        assert_eq!(host.motors(), (0, 0));
        assert!(ctx.console().is_empty());
        assert_eq!(ctx.time_ticks(), 0);

        ctx.config.dt = SimConfig::default().dt;
        host.run_tick(&mut ctx).unwrap();
        assert_eq!(host.controller().setups, 2);
        assert_eq!(host.motors(), (255, 100));
        assert_eq!(ctx.console(), ["setup"]);
    }

    #[test]
    fn test_no_track_skips_controller() {
        let mut ctx = SimulationContext::new(
            SimConfig::default(),
            RobotGeometry::default(),
            Pose::new(0.5, 0.5, 0.0),
            1,
        )
        .unwrap();
        let mut host = ControlHost::new(Scripted::default());
        assert!(matches!(host.run_tick(&mut ctx), Err(SimError::NoTrack)));
        assert_eq!(host.controller().loops, 0);
    }

    #[test]
    fn test_line_follower_steers_back_toward_line() {
        let mut ctx = band_context();
        // 20 mm below the band, heading east: left sensor finds it
        ctx.set_start_pose(Pose::new(0.3, 0.52, 0.0)).unwrap();
        let mut host = ControlHost::new(LineFollower::default());
        host.run_tick(&mut ctx).unwrap();
        let (left, right) = host.motors();
        assert!(right > left);
    }

    #[test]
    fn test_line_follower_tracks_straight_band() {
        let mut ctx = band_context();
        let mut host = ControlHost::new(LineFollower::default());
        for _ in 0..100 {
            let report = host.run_tick(&mut ctx).unwrap();
            assert!(!report.snapshot.out_of_bounds);
        }
        let pose = ctx.robot().pose;
        assert!(pose.x > 0.4);
        assert!((pose.y - 0.5).abs() < 0.02);
    }
}
