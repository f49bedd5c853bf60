//! Simulation settings
//!
//! Every field is live-updatable between ticks without resetting pose.
//! Persisted as JSON next to the host's other files.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::Result;

/// Disturbance preset levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum NoisePreset {
    #[default]
    Ideal,
    Realistic,
    Harsh,
}

impl NoisePreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            NoisePreset::Ideal => "Ideal",
            NoisePreset::Realistic => "Realistic",
            NoisePreset::Harsh => "Harsh",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "ideal" | "none" => Some(NoisePreset::Ideal),
            "realistic" | "real" => Some(NoisePreset::Realistic),
            "harsh" => Some(NoisePreset::Harsh),
            _ => None,
        }
    }

    /// Per-sensor flip probability for this preset
    pub fn sensor_noise_prob(&self) -> f32 {
        match self {
            NoisePreset::Ideal => 0.0,
            NoisePreset::Realistic => 0.01,
            NoisePreset::Harsh => 0.05,
        }
    }

    /// Movement perturbation factor for this preset
    pub fn movement_perturb_factor(&self) -> f32 {
        match self {
            NoisePreset::Ideal => 0.0,
            NoisePreset::Realistic => 0.05,
            NoisePreset::Harsh => 0.15,
        }
    }
}

/// Stepper configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Timestep per tick (seconds)
    pub dt: f32,
    /// Wheel speed at full PWM (m/s)
    pub max_robot_speed: f32,
    /// Fraction of max speed reached at full PWM (0.0 - 1.0)
    pub motor_efficiency: f32,
    /// First-order lag factor per tick (0.0 - 1.0, 1.0 = instant)
    pub motor_response_factor: f32,
    /// Per-sensor flip probability per tick (0.0 - 1.0)
    pub sensor_noise_prob: f32,
    /// Max relative disturbance of displacement and turn (0.0 - 1.0)
    pub movement_perturb_factor: f32,
    /// PWM magnitudes below this are treated as zero
    pub motor_deadband_pwm: i32,
    /// Mean RGB below this counts as line
    pub line_threshold: u8,
    /// Alpha below this counts as background
    pub alpha_cutoff: u8,
    /// Raster pixels per meter
    pub pixels_per_meter: f32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            dt: SIM_DT,
            max_robot_speed: MAX_ROBOT_SPEED,
            motor_efficiency: MOTOR_EFFICIENCY,
            motor_response_factor: MOTOR_RESPONSE_FACTOR,
            sensor_noise_prob: 0.0,
            movement_perturb_factor: 0.0,
            motor_deadband_pwm: MOTOR_DEADBAND_PWM,
            line_threshold: LINE_THRESHOLD,
            alpha_cutoff: ALPHA_CUTOFF,
            pixels_per_meter: PIXELS_PER_METER,
        }
    }
}

impl SimConfig {
    /// Create config from a noise preset (applies preset defaults)
    pub fn from_preset(preset: NoisePreset) -> Self {
        let mut config = Self::default();
        config.apply_preset(preset);
        config
    }

    /// Apply a noise preset (updates disturbance settings only)
    pub fn apply_preset(&mut self, preset: NoisePreset) {
        self.sensor_noise_prob = preset.sensor_noise_prob();
        self.movement_perturb_factor = preset.movement_perturb_factor();
    }

    /// Clamp out-of-range values, logging each correction
    pub fn sanitized(&self) -> Self {
        let defaults = Self::default();
        let mut c = self.clone();

        if !(c.dt.is_finite() && c.dt > 0.0) {
            log::warn!("dt {} invalid, using {}", c.dt, defaults.dt);
            c.dt = defaults.dt;
        }
        if !(c.max_robot_speed.is_finite() && c.max_robot_speed >= 0.0) {
            log::warn!("max_robot_speed {} invalid, using {}", c.max_robot_speed, defaults.max_robot_speed);
            c.max_robot_speed = defaults.max_robot_speed;
        }
        if !(c.pixels_per_meter.is_finite() && c.pixels_per_meter > 0.0) {
            log::warn!("pixels_per_meter {} invalid, using {}", c.pixels_per_meter, defaults.pixels_per_meter);
            c.pixels_per_meter = defaults.pixels_per_meter;
        }
        c.motor_efficiency = clamp_unit("motor_efficiency", c.motor_efficiency);
        c.motor_response_factor = clamp_unit("motor_response_factor", c.motor_response_factor);
        c.sensor_noise_prob = clamp_unit("sensor_noise_prob", c.sensor_noise_prob);
        c.movement_perturb_factor = clamp_unit("movement_perturb_factor", c.movement_perturb_factor);

        let deadband = c.motor_deadband_pwm.clamp(0, PWM_MAX);
        if deadband != c.motor_deadband_pwm {
            log::warn!("motor_deadband_pwm {} clamped to {}", c.motor_deadband_pwm, deadband);
            c.motor_deadband_pwm = deadband;
        }
        c
    }

    /// Load config from a JSON file, falling back to defaults
    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        if let Ok(json) = std::fs::read_to_string(path) {
            match serde_json::from_str::<SimConfig>(&json) {
                Ok(config) => {
                    log::info!("Loaded config from {}", path.display());
                    return config.sanitized();
                }
                Err(e) => log::warn!("Ignoring malformed config {}: {}", path.display(), e),
            }
        }

        log::info!("Using default config");
        Self::default()
    }

    /// Save config as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        log::info!("Config saved to {}", path.as_ref().display());
        Ok(())
    }
}

fn clamp_unit(name: &str, value: f32) -> f32 {
    if !value.is_finite() {
        log::warn!("{} is not finite, using 0", name);
        return 0.0;
    }
    let clamped = value.clamp(0.0, 1.0);
    if clamped != value {
        log::warn!("{} {} clamped to {}", name, value, clamped);
    }
    clamped
}
