//! Trigger engine configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::spatial::DEFAULT_CELL_SIZE;

/// Cooldown configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CooldownConfig {
    /// Apply cooldowns at all
    pub enabled: bool,
    /// Window in seconds
    #[serde(alias = "default-cooldown")]
    pub default_cooldown: f64,
}

impl CooldownConfig {
    /// Window as a duration (negative or invalid values mean no window)
    pub fn window(&self) -> Duration {
        Duration::try_from_secs_f64(self.default_cooldown).unwrap_or(Duration::ZERO)
    }
}

impl Default for CooldownConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_cooldown: 3.0,
        }
    }
}

/// Trigger engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerConfig {
    /// Spatial index cell edge length
    pub cell_size: f64,
    /// Cooldown settings
    pub cooldowns: CooldownConfig,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            cell_size: DEFAULT_CELL_SIZE,
            cooldowns: CooldownConfig::default(),
        }
    }
}
