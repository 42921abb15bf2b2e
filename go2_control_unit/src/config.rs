//! Control unit configuration: cycle period, topics and trajectory.
//!
//! Every field has a default, so an empty file (or no file at all) yields
//! the stock single-joint demo at 500 Hz.
//!
//! ```toml
//! cycle_time_us = 2000
//!
//! [shared]
//! service_name = "go2-control-unit"
//!
//! [topics]
//! lowcmd = "rt/lowcmd"
//! lowstate = "rt/lowstate"
//!
//! [trajectory]
//! ramp_ticks = 200
//! frequency_hz = 1.0
//!
//! [[trajectory.joints]]
//! slot = 2
//! neutral = -2.0
//! amplitude = -0.9
//! commanded = true
//! ```

use go2_common::config::{ConfigError, ConfigLoader, SharedConfig};
use go2_common::consts::{CONTROL_CYCLE_US, TOPIC_LOWCMD, TOPIC_LOWSTATE};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::trajectory::TrajectoryParams;

/// Accepted cycle period range [µs].
pub const CYCLE_TIME_US_MIN: u64 = 500;
pub const CYCLE_TIME_US_MAX: u64 = 20_000;

/// Topic names used by the control unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopicConfig {
    pub lowcmd: String,
    pub lowstate: String,
}

impl Default for TopicConfig {
    fn default() -> Self {
        Self {
            lowcmd: TOPIC_LOWCMD.to_string(),
            lowstate: TOPIC_LOWSTATE.to_string(),
        }
    }
}

/// Top-level control unit configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ControlUnitConfig {
    #[serde(default = "default_shared")]
    pub shared: SharedConfig,
    /// Nominal control period [µs].
    #[serde(default = "default_cycle_time_us")]
    pub cycle_time_us: u64,
    #[serde(default)]
    pub topics: TopicConfig,
    #[serde(default)]
    pub trajectory: TrajectoryParams,
}

fn default_shared() -> SharedConfig {
    SharedConfig::named("go2-control-unit")
}

fn default_cycle_time_us() -> u64 {
    CONTROL_CYCLE_US
}

impl Default for ControlUnitConfig {
    fn default() -> Self {
        Self {
            shared: default_shared(),
            cycle_time_us: default_cycle_time_us(),
            topics: TopicConfig::default(),
            trajectory: TrajectoryParams::default(),
        }
    }
}

impl ControlUnitConfig {
    /// # Errors
    /// `ConfigError::ValidationError` naming the first violated rule.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        if !(CYCLE_TIME_US_MIN..=CYCLE_TIME_US_MAX).contains(&self.cycle_time_us) {
            return Err(ConfigError::ValidationError(format!(
                "cycle_time_us {} out of range [{CYCLE_TIME_US_MIN}, {CYCLE_TIME_US_MAX}]",
                self.cycle_time_us
            )));
        }
        if self.topics.lowcmd.is_empty() || self.topics.lowstate.is_empty() {
            return Err(ConfigError::ValidationError(
                "topic names cannot be empty".to_string(),
            ));
        }
        self.trajectory
            .validate()
            .map_err(|e| ConfigError::ValidationError(format!("trajectory: {e}")))
    }
}

// ─── Loading Functions ──────────────────────────────────────────────

/// Load and validate the control unit configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ControlUnitConfig, ConfigError> {
    let config = ControlUnitConfig::load(path)?;
    config.validate()?;
    Ok(config)
}

/// Load config from a TOML string (for testing).
pub fn load_config_from_str(content: &str) -> Result<ControlUnitConfig, ConfigError> {
    let config = ControlUnitConfig::parse(content)?;
    config.validate()?;
    Ok(config)
}
