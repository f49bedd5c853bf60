//! Fixed timestep simulation tick
//!
//! One tick: sense → convert PWM → integrate → advance clock → lap timer
//! → bounds check → snapshot. The sensor reading is taken from the pose
//! left by the previous tick, so it is the one the control logic saw
//! when choosing this tick's motor commands.

use serde::{Deserialize, Serialize};

use super::context::SimulationContext;
use super::kinematics::{MotionParams, integrate};
use super::lap::LapDisplay;
use super::sensors::SensorReadings;
use super::state::{Pose, RobotGeometry};
use super::surface::TrackSurface;
use crate::consts::PWM_MAX;
use crate::error::{Result, SimError};
use crate::settings::SimConfig;

/// Motor commands for a single tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickInput {
    /// Left wheel PWM (-255..=255, positive = forward)
    pub left_pwm: i32,
    /// Right wheel PWM (-255..=255, positive = forward)
    pub right_pwm: i32,
}

/// Everything the renderer and UI consume after a tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub tick: u64,
    pub pose: Pose,
    /// Readings the control logic saw for this tick
    pub sensors: SensorReadings,
    /// (left, right) wheel speeds after lag, m/s
    pub applied_speeds: (f32, f32),
    pub lap: LapDisplay,
    /// A lap was completed on this tick
    pub crossed: bool,
    pub lap_time: Option<f32>,
    pub sim_time: f32,
    pub out_of_bounds: bool,
}

/// PWM to target wheel speed, honoring the deadband
pub fn pwm_to_speed(pwm: i32, config: &SimConfig) -> f32 {
    let pwm = pwm.clamp(-PWM_MAX, PWM_MAX);
    if pwm.abs() < config.motor_deadband_pwm {
        return 0.0;
    }
    (pwm as f32 / PWM_MAX as f32) * config.max_robot_speed * config.motor_efficiency
}

/// Whether the pose, grown by the robot margin, leaves the raster extents
pub fn is_out_of_bounds(pose: &Pose, geometry: &RobotGeometry, surface: &TrackSurface, pixels_per_meter: f32) -> bool {
    let margin = geometry.bounds_margin();
    let width = surface.width() as f32 / pixels_per_meter;
    let height = surface.height() as f32 / pixels_per_meter;
    pose.x - margin < 0.0 || pose.y - margin < 0.0 || pose.x + margin > width || pose.y + margin > height
}

/// Advance the simulation by one fixed timestep
///
/// Without a loaded track nothing is mutated and `NoTrack` is returned.
/// A numeric fault leaves pose, actuators and clock at their last values.
pub fn tick(ctx: &mut SimulationContext, input: &TickInput) -> Result<Snapshot> {
    if !ctx.surface.is_loaded() {
        return Err(SimError::NoTrack);
    }

    let sensors = ctx.sense();

    let config = &ctx.config;
    let left_pwm = input.left_pwm.clamp(-PWM_MAX, PWM_MAX);
    let right_pwm = input.right_pwm.clamp(-PWM_MAX, PWM_MAX);
    let target_left = pwm_to_speed(left_pwm, config);
    let target_right = pwm_to_speed(right_pwm, config);
    let params = MotionParams {
        dt: config.dt,
        response_factor: config.motor_response_factor,
        max_speed: config.max_robot_speed,
        perturb_factor: config.movement_perturb_factor,
    };

    integrate(&mut ctx.robot, target_left, target_right, &params, ctx.rng.as_mut())?;
    ctx.robot.actuators.commanded_left_pwm = left_pwm;
    ctx.robot.actuators.commanded_right_pwm = right_pwm;

    ctx.sim_time += params.dt;
    ctx.time_ticks += 1;
    ctx.robot.record_trail();

    let pose = ctx.robot.pose;
    let lap_event = ctx.lap_timer.update(&pose, ctx.sim_time);

    let out_of_bounds = is_out_of_bounds(&pose, &ctx.robot.geometry, &ctx.surface, ctx.config.pixels_per_meter);
    if out_of_bounds != ctx.out_of_bounds {
        if out_of_bounds {
            log::info!("Robot left the track area at ({:.3}, {:.3})", pose.x, pose.y);
        } else {
            log::info!("Robot back inside the track area");
        }
        ctx.out_of_bounds = out_of_bounds;
    }

    Ok(Snapshot {
        tick: ctx.time_ticks,
        pose,
        sensors,
        applied_speeds: ctx.robot.actuators.applied(),
        lap: ctx.lap_timer.display(ctx.sim_time),
        crossed: lap_event.crossed,
        lap_time: lap_event.lap_time,
        sim_time: ctx.sim_time,
        out_of_bounds,
    })
}
