// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the configuration of the simulated gripper.
//!
//! The configuration is read once when the [`GripperSim`](`crate::GripperSim`) is created.
//! It can be built in code or loaded from a TOML document:
//! ```
//! use franka_gripper_sim::GripperSimConfig;
//! let config = GripperSimConfig::from_toml_str(
//!     r#"
//!     speed_samples = 20
//!     tolerance_move = 0.002
//!
//!     [finger1]
//!     p = 200.0
//!     "#,
//! )
//! .unwrap();
//! assert_eq!(config.speed_samples, 20);
//! assert_eq!(config.finger2.p, 100.0);
//! ```
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::exception::{create_config_exception, GripperResult};

/// Maximum opening width of the Franka Hand. \[m\]
pub const MAX_FINGER_WIDTH: f64 = 0.08;

/// Largest accepted stall window.
pub const MAX_SPEED_SAMPLES: usize = 10_000;

/// Gains of the position controller of one finger.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
#[serde(default)]
pub struct PidGains {
    /// Proportional gain \[N/m\]
    pub p: f64,
    /// Integral gain \[N/(m s)\]
    pub i: f64,
    /// Derivative gain \[N s/m\]
    pub d: f64,
    /// Absolute limit of the integral contribution \[N\]
    pub i_clamp: f64,
}

impl Default for PidGains {
    fn default() -> Self {
        PidGains {
            p: 100.,
            i: 50.,
            d: 1.,
            i_clamp: 1.,
        }
    }
}

/// Parameters of the simulated gripper.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
#[serde(default)]
pub struct GripperSimConfig {
    /// Number of consecutive velocity samples used for stall detection, at most
    /// [`MAX_SPEED_SAMPLES`].
    pub speed_samples: usize,
    /// Mean absolute finger velocity below which the fingers count as stalled. \[m/s\]
    pub speed_threshold: f64,
    /// Speed used by the generic gripper command. \[m/s\]
    pub speed_default: f64,
    /// Speed of the homing sweep. \[m/s\]
    pub homing_speed: f64,
    /// Width tolerance for a move to be considered finished. \[m\]
    pub tolerance_move: f64,
    /// Symmetric grasp epsilon used by the generic gripper command. \[m\]
    pub tolerance_gripper_action: f64,
    /// Maximum opening width of the fingers. \[m\]
    pub max_finger_width: f64,
    /// Rate at which the joint states are published. \[Hz\]
    pub publish_rate: f64,
    /// Gains of the first finger.
    pub finger1: PidGains,
    /// Gains of the second finger.
    pub finger2: PidGains,
}

impl Default for GripperSimConfig {
    fn default() -> Self {
        GripperSimConfig {
            speed_samples: 10,
            speed_threshold: 0.001,
            speed_default: 0.1,
            homing_speed: 0.02,
            tolerance_move: 0.005,
            tolerance_gripper_action: 0.005,
            max_finger_width: MAX_FINGER_WIDTH,
            publish_rate: 30.,
            finger1: PidGains::default(),
            finger2: PidGains::default(),
        }
    }
}

impl GripperSimConfig {
    /// Parses and validates a configuration from a TOML document. Missing keys take their
    /// default values.
    /// # Errors
    /// * [`ConfigException`](`crate::exception::GripperException::ConfigException`) if the document
    /// cannot be parsed or contains invalid values.
    pub fn from_toml_str(document: &str) -> GripperResult<GripperSimConfig> {
        let config: GripperSimConfig = toml::from_str(document)
            .map_err(|e| create_config_exception(format!("invalid gripper config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a configuration from a TOML file.
    /// # Errors
    /// * [`ConfigException`](`crate::exception::GripperException::ConfigException`) if the file
    /// cannot be read or contains an invalid configuration.
    pub fn from_file<P: AsRef<Path>>(path: P) -> GripperResult<GripperSimConfig> {
        let path = path.as_ref();
        let document = std::fs::read_to_string(path).map_err(|e| {
            create_config_exception(format!("could not read {}: {}", path.display(), e))
        })?;
        GripperSimConfig::from_toml_str(&document)
    }

    /// Checks that all parameters are within their physical bounds.
    pub fn validate(&self) -> GripperResult<()> {
        if self.speed_samples == 0 || self.speed_samples > MAX_SPEED_SAMPLES {
            return Err(create_config_exception(format!(
                "speed_samples must be between 1 and {}, got {}",
                MAX_SPEED_SAMPLES, self.speed_samples
            )));
        }
        let positive = [
            ("speed_threshold", self.speed_threshold),
            ("speed_default", self.speed_default),
            ("homing_speed", self.homing_speed),
            ("max_finger_width", self.max_finger_width),
            ("publish_rate", self.publish_rate),
        ];
        for (name, value) in positive.iter() {
            if !(value.is_finite() && *value > 0.) {
                return Err(create_config_exception(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }
        let non_negative = [
            ("tolerance_move", self.tolerance_move),
            ("tolerance_gripper_action", self.tolerance_gripper_action),
        ];
        for (name, value) in non_negative.iter() {
            if !(value.is_finite() && *value >= 0.) {
                return Err(create_config_exception(format!(
                    "{} must not be negative, got {}",
                    name, value
                )));
            }
        }
        for (name, gains) in [("finger1", self.finger1), ("finger2", self.finger2)].iter() {
            let values = [gains.p, gains.i, gains.d, gains.i_clamp];
            if values.iter().any(|x| !x.is_finite() || *x < 0.) {
                return Err(create_config_exception(format!(
                    "gains of {} must be finite and not negative: {:?}",
                    name, gains
                )));
            }
        }
        Ok(())
    }
}
