//! Static vehicle and controller configuration.
//!
//! [`CarParams`] is read once at startup, typically from a TOML file, and
//! stays fixed for the life of the controller. Gains that can change while
//! driving live in [`TuningParameters`](crate::tuning::TuningParameters)
//! instead.

use crate::{error::ConfigError, schedule::GainSchedule, vehicle_model::VehicleGeometry};
use serde::Deserialize;
use std::path::Path;

/// Looks up the actuator limit for the current speed.
pub trait SteerLimits {
    fn max_steer(&self, speed: f64) -> f64;
}

#[derive(Debug, Clone, Deserialize)]
pub struct LateralTuning {
    pub kp: GainSchedule,
    pub ki: GainSchedule,
    pub kd: GainSchedule,
    pub kf: f64,
    #[serde(default)]
    pub deadzone: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CarParams {
    pub lateral_tuning: LateralTuning,
    /// Seconds the output may stay pinned at a limit before it is reported
    /// as saturated.
    pub steer_limit_timer: f64,
    pub steer_max: GainSchedule,
    pub vehicle: VehicleGeometry,
}

impl SteerLimits for CarParams {
    fn max_steer(&self, speed: f64) -> f64 {
        self.steer_max.interp(speed)
    }
}

impl CarParams {
    pub fn from_toml_str(content: &str, source_name: &str) -> Result<Self, ConfigError> {
        let params: CarParams = toml::from_str(content).map_err(|e| ConfigError::Parse {
            file: source_name.to_string(),
            source: e,
        })?;
        params.validate()?;
        Ok(params)
    }

    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            file: path.display().to_string(),
            source: e,
        })?;
        Self::from_toml_str(&content, &path.display().to_string())
    }

    /// Checks constraints the types cannot express. All violations are
    /// reported together.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let Self {
            ref lateral_tuning,
            steer_limit_timer,
            ref steer_max,
            ref vehicle,
        } = *self;
        let mut errors = Vec::new();

        require_non_negative(&mut errors, "lateral_tuning.kf", lateral_tuning.kf);
        require_non_negative(&mut errors, "lateral_tuning.deadzone", lateral_tuning.deadzone);
        require_non_negative(&mut errors, "steer_limit_timer", steer_limit_timer);
        if steer_max.values().any(|v| v <= 0.0) {
            errors.push("steer_max values must all be > 0".to_string());
        }
        errors.extend(vehicle.violations());

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors.join("\n")))
        }
    }
}

fn require_non_negative(errors: &mut Vec<String>, field: &str, value: f64) {
    if value.is_nan() || value < 0.0 {
        errors.push(format!("{field} must be >= 0, got {value}"));
    }
}
