//! Defines the configuration for the built-in frame runner.
//!
//! These structs are designed to be deserialized from a configuration file
//! (e.g., a TOML file) using `serde` and the `config` crate. The scheduler
//! itself needs no configuration; only the runner that drives it from a
//! wall clock does.

use crate::error::{Result, ThreadError};
use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Prefix of the environment variables that override file settings,
/// e.g. `FRAMETHREADS__FIXED_TIMESTEP=0.01`.
pub const ENV_PREFIX: &str = "FRAMETHREADS";

/// The top-level configuration for the frame runner.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ClockConfig {
    /// How often the runner produces a frame.
    #[serde(default = "default_resolution")]
    pub resolution: ClockResolution,

    /// Seconds between two fixed steps.
    #[serde(default = "default_fixed_timestep")]
    pub fixed_timestep: f64,

    /// Upper bound on fixed steps run in a single frame.
    #[serde(default = "default_max_fixed_steps")]
    pub max_fixed_steps: u32,
}

/// Defines the frame rate of the runner.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClockResolution {
    /// ~60 frames per second.
    High,
    /// ~30 frames per second.
    Medium,
    /// ~1 frame per second. Handy for watching lifecycles in a log.
    Low,
    /// A user-defined rate in frames per second.
    Custom { ticks_per_second: u64 },
}

impl ClockResolution {
    pub fn ticks_per_second(&self) -> u64 {
        match self {
            ClockResolution::High => 60,
            ClockResolution::Medium => 30,
            ClockResolution::Low => 1,
            ClockResolution::Custom { ticks_per_second } => *ticks_per_second,
        }
    }

    /// Wall time between two frames.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.ticks_per_second().max(1) as f64)
    }
}

impl ClockConfig {
    /// Loads a configuration from a TOML file, overlaid by `FRAMETHREADS__*`
    /// environment variables.
    pub fn from_file(path: impl AsRef<Path>) -> std::result::Result<Self, config::ConfigError> {
        Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?
            .try_deserialize()
    }

    /// Parses a configuration from TOML text.
    pub fn from_toml_str(source: &str) -> std::result::Result<Self, config::ConfigError> {
        Config::builder()
            .add_source(File::from_str(source, FileFormat::Toml))
            .build()?
            .try_deserialize()
    }

    /// Checks the values a runner cannot work with.
    pub fn validate(&self) -> Result<()> {
        if !(self.fixed_timestep > 0.0) || !self.fixed_timestep.is_finite() {
            return Err(ThreadError::InvalidArgument(format!(
                "fixed_timestep must be a positive number of seconds, got {}",
                self.fixed_timestep
            )));
        }
        if self.max_fixed_steps == 0 {
            return Err(ThreadError::InvalidArgument(
                "max_fixed_steps must be at least 1".to_string(),
            ));
        }
        if self.resolution.ticks_per_second() == 0 {
            return Err(ThreadError::InvalidArgument(
                "resolution must produce at least one tick per second".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            resolution: default_resolution(),
            fixed_timestep: default_fixed_timestep(),
            max_fixed_steps: default_max_fixed_steps(),
        }
    }
}

// --- Default value functions for serde ---

fn default_resolution() -> ClockResolution {
    ClockResolution::High
}

fn default_fixed_timestep() -> f64 {
    0.02
}

fn default_max_fixed_steps() -> u32 {
    8
}
