//! Engine-wide defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Defaults applied to worlds that do not specify their own values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Gravity for empty worlds, in m/s^2.
    pub gravity: [f64; 3],
    /// Step size in seconds.
    pub time_step: f64,
    /// Constraint solver iterations per step.
    pub solver_iterations: usize,
    /// Damping used by joint velocity servos.
    pub velocity_servo_damping: f64,
    /// Force/torque limit of joint velocity servos.
    pub velocity_servo_max_force: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            gravity: [0.0, 0.0, -9.8],
            time_step: 0.001,
            solver_iterations: 4,
            velocity_servo_damping: 1000.0,
            velocity_servo_max_force: 1.0e6,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a TOML string.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.time_step > 0.0 && self.time_step.is_finite()) {
            return Err(ConfigError::InvalidValue {
                field: "time_step",
                value: self.time_step,
            });
        }
        if self.solver_iterations == 0 {
            return Err(ConfigError::InvalidValue {
                field: "solver_iterations",
                value: 0.0,
            });
        }
        if self.velocity_servo_damping <= 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "velocity_servo_damping",
                value: self.velocity_servo_damping,
            });
        }
        Ok(())
    }
}
