//! Deterministic simulation module
//!
//! All robot physics and sensing lives here. This module must stay pure:
//! - Fixed timestep only
//! - Injected randomness only
//! - Mutation only through `tick`, once per host tick
//! - No rendering or platform dependencies

pub mod context;
pub mod kinematics;
pub mod lap;
pub mod random;
pub mod sensors;
pub mod state;
pub mod surface;
pub mod tick;

pub use context::{CONSOLE_CAPACITY, SimulationContext};
pub use kinematics::{MotionParams, integrate, lag_toward};
pub use lap::{LapDisplay, LapEvent, LapRecord, LapTimer, StartLine};
pub use random::{RandomSource, RngState, SequenceRandom};
pub use sensors::{SensorId, SensorReadings, sample, sensor_positions};
pub use state::{ActuatorState, Pose, RobotGeometry, RobotState, TRAIL_LENGTH, TrailPoint};
pub use surface::TrackSurface;
pub use tick::{Snapshot, TickInput, is_out_of_bounds, pwm_to_speed, tick};
