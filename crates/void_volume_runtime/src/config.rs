//! Runtime Configuration
//!
//! # Configuration Sources (in priority order)
//!
//! 1. Environment variables: `VOLUMED_STORE`, `VOLUMED_COOLDOWN`,
//!    `VOLUMED_TICK_MS`
//! 2. Config file: first of `volumed.toml`, `/etc/void/volumed.toml`
//! 3. Built-in defaults
//!
//! # Example Config File
//!
//! ```toml
//! store_path = "volumes.json"
//! tick_millis = 50
//! permission_node = "triggervolumes.use"
//!
//! [entities]
//! blocked_entities = [13]
//!
//! [triggers]
//! cell_size = 16.0
//!
//! [triggers.cooldowns]
//! enabled = true
//! default-cooldown = 3.0
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use void_volumes::{EntityFilter, TriggerConfig};

/// Files probed for configuration, first match wins
pub const CONFIG_CANDIDATES: &[&str] = &["volumed.toml", "/etc/void/volumed.toml"];

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// File is not valid TOML for this schema
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// A value is out of range
    #[error("Invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

/// Complete runtime configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Volume store file
    pub store_path: PathBuf,
    /// Simulation tick length used by `wait`
    pub tick_millis: u64,
    /// Permission entities need to trigger volumes
    pub permission_node: String,
    /// Whether newly connected entities hold the permission
    pub grant_by_default: bool,
    /// Entities allowed or blocked regardless of permission grants
    pub entities: EntityFilter,
    /// Trigger engine settings
    pub triggers: TriggerConfig,
    /// Config file path (for reloading)
    #[serde(skip)]
    pub config_path: Option<String>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from("volumes.json"),
            tick_millis: 50,
            permission_node: "triggervolumes.use".to_string(),
            grant_by_default: true,
            entities: EntityFilter::default(),
            triggers: TriggerConfig::default(),
            config_path: None,
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from all sources
    pub fn load() -> Self {
        let mut config = Self::default();

        for path in CONFIG_CANDIDATES {
            if !Path::new(path).exists() {
                continue;
            }
            match Self::load_from_file(path) {
                Ok(loaded) => {
                    config = loaded;
                    config.config_path = Some(path.to_string());
                    log::info!("Loaded runtime config from {}", path);
                    break;
                }
                Err(e) => log::warn!("Ignoring config file {}: {}", path, e),
            }
        }

        if let Err(e) = config.apply_overrides(|key| std::env::var(key).ok()) {
            log::warn!("Ignoring environment override: {}", e);
        }

        config
    }

    /// Load configuration from a TOML file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_millis == 0 {
            return Err(ConfigError::Invalid {
                key: "tick_millis",
                value: "0".to_string(),
            });
        }
        let cooldown = self.triggers.cooldowns.default_cooldown;
        if !cooldown.is_finite() || cooldown < 0.0 {
            return Err(ConfigError::Invalid {
                key: "default_cooldown",
                value: cooldown.to_string(),
            });
        }
        Ok(())
    }

    /// Apply `VOLUMED_*` overrides from a variable lookup. Overrides that
    /// parsed before a bad one stay applied.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("VOLUMED_STORE").filter(|p| !p.is_empty()) {
            self.store_path = PathBuf::from(path);
            log::info!("Store path from env: {}", self.store_path.display());
        }

        if let Some(value) = lookup("VOLUMED_COOLDOWN") {
            match value.trim() {
                "off" | "false" => self.triggers.cooldowns.enabled = false,
                secs => {
                    let secs = secs
                        .parse::<f64>()
                        .ok()
                        .filter(|s| s.is_finite() && *s >= 0.0)
                        .ok_or(ConfigError::Invalid {
                            key: "VOLUMED_COOLDOWN",
                            value: value.clone(),
                        })?;
                    self.triggers.cooldowns.enabled = true;
                    self.triggers.cooldowns.default_cooldown = secs;
                }
            }
        }

        if let Some(value) = lookup("VOLUMED_TICK_MS") {
            self.tick_millis = value
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|ms| *ms > 0)
                .ok_or(ConfigError::Invalid {
                    key: "VOLUMED_TICK_MS",
                    value: value.clone(),
                })?;
        }

        Ok(())
    }

    /// Tick length
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_millis)
    }

    /// Log the effective configuration
    pub fn print_summary(&self) {
        log::info!("Runtime Configuration:");
        log::info!("  Store: {}", self.store_path.display());
        log::info!("  Tick: {} ms", self.tick_millis);
        log::info!("  Permission: {} (default {})", self.permission_node, self.grant_by_default);
        if !self.entities.is_empty() {
            log::info!(
                "  Entities: {} allowed, {} blocked",
                self.entities.allowed_entities.len(),
                self.entities.blocked_entities.len()
            );
        }
        log::info!("  Cell size: {}", self.triggers.cell_size);
        if self.triggers.cooldowns.enabled {
            log::info!("  Cooldown: {} s", self.triggers.cooldowns.default_cooldown);
        } else {
            log::info!("  Cooldown: disabled");
        }
        if let Some(path) = &self.config_path {
            log::info!("  Config: {}", path);
        }
    }
}
