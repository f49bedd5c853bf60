//! Differential-drive kinematics
//!
//! First-order actuator lag, speed clamping, optional multiplicative
//! disturbance, then unicycle integration of the pose.

use super::random::RandomSource;
use super::state::RobotState;
use crate::error::{Result, SimError};
use crate::normalize_angle;

/// Wheelbases below this produce no rotation
const MIN_WHEELBASE: f32 = 1e-6;

/// Per-tick integration parameters
#[derive(Debug, Clone, Copy)]
pub struct MotionParams {
    pub dt: f32,
    /// Fraction of the remaining gap closed per tick (0.0 - 1.0)
    pub response_factor: f32,
    /// Applied speed limit (m/s)
    pub max_speed: f32,
    /// Relative disturbance bound, 0 disables
    pub perturb_factor: f32,
}

/// Advance actuators and pose by one tick
///
/// On a non-finite input or result the robot is left untouched and a
/// `NumericFault` is returned.
pub fn integrate(
    robot: &mut RobotState,
    target_left: f32,
    target_right: f32,
    params: &MotionParams,
    rng: &mut dyn RandomSource,
) -> Result<()> {
    let inputs = [
        ("dt", params.dt),
        ("response_factor", params.response_factor),
        ("max_speed", params.max_speed),
        ("perturb_factor", params.perturb_factor),
        ("target_left", target_left),
        ("target_right", target_right),
    ];
    if let Some((name, value)) = inputs.iter().find(|(_, v)| !v.is_finite()) {
        log::warn!("Rejected non-finite {} = {}", name, value);
        return Err(SimError::NumericFault(format!("{name} = {value}")));
    }

    let response = params.response_factor.clamp(0.0, 1.0);
    let max_speed = params.max_speed.abs();
    let act = robot.actuators;

    let left = lag_toward(act.applied_left_speed, target_left, response).clamp(-max_speed, max_speed);
    let right = lag_toward(act.applied_right_speed, target_right, response).clamp(-max_speed, max_speed);

    let mut displacement = (right + left) / 2.0 * params.dt;
    // y grows downward: right wheel faster turns left, decreasing angle
    let mut d_theta = if robot.geometry.wheelbase.abs() < MIN_WHEELBASE {
        0.0
    } else {
        (left - right) / robot.geometry.wheelbase * params.dt
    };

    if params.perturb_factor > 0.0 {
        displacement *= 1.0 + rng.symmetric(params.perturb_factor);
        d_theta *= 1.0 + rng.symmetric(params.perturb_factor);
    }

    let pose = robot.pose;
    let x = pose.x + displacement * pose.angle.cos();
    let y = pose.y + displacement * pose.angle.sin();
    let angle = normalize_angle(pose.angle + d_theta);

    if ![left, right, x, y, angle].iter().all(|v| v.is_finite()) {
        log::warn!("Integration produced non-finite pose, keeping previous state");
        return Err(SimError::NumericFault("integration overflow".into()));
    }

    robot.actuators.applied_left_speed = left;
    robot.actuators.applied_right_speed = right;
    robot.pose.x = x;
    robot.pose.y = y;
    robot.pose.angle = angle;
    Ok(())
}

/// One step of first-order lag
#[inline]
pub fn lag_toward(applied: f32, target: f32, response: f32) -> f32 {
    applied + (target - applied) * response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::random::{RngState, SequenceRandom};
    use crate::sim::state::{Pose, RobotGeometry};
    use proptest::prelude::*;
    use std::f32::consts::PI;

    fn robot() -> RobotState {
        RobotState::new(
            RobotGeometry {
                wheelbase: 0.1,
                ..Default::default()
            },
            Pose::new(0.0, 0.0, 0.0),
        )
    }

    fn params(response: f32) -> MotionParams {
        MotionParams {
            dt: 0.02,
            response_factor: response,
            max_speed: 0.5,
            perturb_factor: 0.0,
        }
    }

    #[test]
    fn test_straight_instant_response() {
        let mut r = robot();
        let mut rng = SequenceRandom::new(vec![]);
        integrate(&mut r, 0.4, 0.4, &params(1.0), &mut rng).unwrap();
        assert!((r.pose.x - 0.4 * 0.02).abs() < 1e-7);
        assert_eq!(r.pose.y, 0.0);
        assert_eq!(r.pose.angle, 0.0);
        assert_eq!(rng.draws(), 0);
    }

    #[test]
    fn test_right_wheel_faster_decreases_angle() {
        let mut r = robot();
        let mut rng = SequenceRandom::new(vec![]);
        integrate(&mut r, 0.0, 0.3, &params(1.0), &mut rng).unwrap();
        // (0 - 0.3) / 0.1 * 0.02
        assert!((r.pose.angle + 0.06).abs() < 1e-6);
    }

    #[test]
    fn test_speed_clamped() {
        let mut r = robot();
        let mut rng = SequenceRandom::new(vec![]);
        integrate(&mut r, 5.0, -5.0, &params(1.0), &mut rng).unwrap();
        assert_eq!(r.actuators.applied(), (0.5, -0.5));
    }

    #[test]
    fn test_zero_wheelbase_no_rotation() {
        let mut r = robot();
        r.geometry.wheelbase = 0.0;
        let mut rng = SequenceRandom::new(vec![]);
        integrate(&mut r, 0.1, 0.4, &params(1.0), &mut rng).unwrap();
        assert_eq!(r.pose.angle, 0.0);
        assert!(r.pose.x > 0.0);
    }

    #[test]
    fn test_non_finite_rejected_without_mutation() {
        let mut r = robot();
        r.actuators.applied_left_speed = 0.2;
        let before = r.clone();
        let mut rng = SequenceRandom::new(vec![]);
        let err = integrate(&mut r, f32::NAN, 0.1, &params(0.5), &mut rng);
        assert!(matches!(err, Err(SimError::NumericFault(_))));
        assert_eq!(r.pose, before.pose);
        assert_eq!(r.actuators, before.actuators);

        let bad_dt = MotionParams {
            dt: f32::INFINITY,
            ..params(0.5)
        };
        assert!(integrate(&mut r, 0.1, 0.1, &bad_dt, &mut rng).is_err());
        assert_eq!(r.pose, before.pose);
    }

    #[test]
    fn test_perturbation_scales_displacement() {
        let mut r = robot();
        // draws 1.0 -> +0.2 on displacement, 0.5 -> 0 on rotation
        let mut rng = SequenceRandom::new(vec![0.999_999_9, 0.5]);
        let p = MotionParams {
            perturb_factor: 0.2,
            ..params(1.0)
        };
        integrate(&mut r, 0.4, 0.4, &p, &mut rng).unwrap();
        assert!((r.pose.x - 0.4 * 0.02 * 1.2).abs() < 1e-6);
        assert_eq!(rng.draws(), 2);
    }

    #[test]
    fn test_determinism_without_disturbance() {
        let mut a = robot();
        let mut b = robot();
        let mut rng_a = RngState::new(1).to_rng();
        let mut rng_b = RngState::new(2).to_rng();
        let commands = [(0.3, 0.1), (0.2, 0.5), (-0.1, 0.4), (0.5, 0.5)];
        for _ in 0..50 {
            for &(l, rr) in &commands {
                integrate(&mut a, l, rr, &params(0.3), &mut rng_a).unwrap();
                integrate(&mut b, l, rr, &params(0.3), &mut rng_b).unwrap();
                assert_eq!(a.pose.x.to_bits(), b.pose.x.to_bits());
                assert_eq!(a.pose.y.to_bits(), b.pose.y.to_bits());
                assert_eq!(a.pose.angle.to_bits(), b.pose.angle.to_bits());
            }
        }
    }

    proptest! {
        #[test]
        fn lag_converges_without_overshoot(
            target in -0.5f32..0.5,
            response in 0.01f32..0.99,
        ) {
            let mut r = robot();
            let mut rng = SequenceRandom::new(vec![]);
            let mut gap = target.abs();
            for _ in 0..100 {
                integrate(&mut r, target, target, &params(response), &mut rng).unwrap();
                let applied = r.actuators.applied_left_speed;
                let new_gap = (target - applied).abs();
                prop_assert!(new_gap <= gap);
                // never crosses past the target
                prop_assert!(applied * target.signum() <= target.abs() + 1e-6);
                gap = new_gap;
            }
        }

        #[test]
        fn angle_stays_normalized(
            left in -0.5f32..0.5,
            right in -0.5f32..0.5,
            ticks in 1usize..200,
        ) {
            let mut r = robot();
            let mut rng = SequenceRandom::new(vec![]);
            for _ in 0..ticks {
                integrate(&mut r, left, right, &params(0.5), &mut rng).unwrap();
                prop_assert!(r.pose.angle > -PI && r.pose.angle <= PI);
            }
        }
    }
}
