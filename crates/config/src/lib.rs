#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Configuration management for otactl
//!
//! This crate handles loading configuration from:
//! - Default values (hard-coded)
//! - Configuration file (TOML)
//!
//! The battery thresholds default to the platform's stock values; the
//! charging threshold is the lower of the two.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

use otactl_errors::{ConfigError, Error};
use otactl_types::BatteryPolicy;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub battery: BatteryConfig,

    #[serde(default)]
    pub paths: PathConfig,
}

/// Battery precondition configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatteryConfig {
    #[serde(default = "default_discharging_min")]
    pub discharging_min: u8,
    #[serde(default = "default_charging_min")]
    pub charging_min: u8,
}

/// Path configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathConfig {
    /// Staging directory for the canonical update package copy. Also the
    /// well-known location the recovery-mediated phase reads from.
    #[serde(default = "default_staging_dir")]
    pub staging_dir: PathBuf,
}

impl BatteryConfig {
    /// The policy thresholds as consumed by the precondition gate.
    #[must_use]
    pub fn policy(&self) -> BatteryPolicy {
        BatteryPolicy {
            discharging_min: self.discharging_min,
            charging_min: self.charging_min,
        }
    }
}

// Default implementations

impl Default for BatteryConfig {
    fn default() -> Self {
        Self {
            discharging_min: default_discharging_min(),
            charging_min: default_charging_min(),
        }
    }
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            staging_dir: default_staging_dir(),
        }
    }
}

fn default_discharging_min() -> u8 {
    40
}

fn default_charging_min() -> u8 {
    20
}

fn default_staging_dir() -> PathBuf {
    PathBuf::from("/data/ota_package")
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid TOML, or
    /// fails validation.
    pub async fn load(path: &Path) -> Result<Self, Error> {
        let contents = fs::read_to_string(path)
            .await
            .map_err(|e| ConfigError::ReadFailed {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

        let config: Self = toml::from_str(&contents).map_err(|e| ConfigError::ParseFailed {
            message: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults when
    /// the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file cannot be read or parsed.
    pub async fn load_or_default(path: &Path) -> Result<Self, Error> {
        if fs::try_exists(path).await.unwrap_or(false) {
            Self::load(path).await
        } else {
            Ok(Self::default())
        }
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` when a threshold is out of range or
    /// the charging threshold exceeds the discharging one.
    pub fn validate(&self) -> Result<(), Error> {
        if self.battery.discharging_min > 100 {
            return Err(ConfigError::Invalid {
                field: "battery.discharging_min".to_string(),
                message: "must be a percentage in 0..=100".to_string(),
            }
            .into());
        }
        if self.battery.charging_min > 100 {
            return Err(ConfigError::Invalid {
                field: "battery.charging_min".to_string(),
                message: "must be a percentage in 0..=100".to_string(),
            }
            .into());
        }
        if self.battery.charging_min > self.battery.discharging_min {
            return Err(ConfigError::Invalid {
                field: "battery.charging_min".to_string(),
                message: "charging threshold must not exceed the discharging threshold".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_stock_thresholds() {
        let config = Config::default();
        assert_eq!(config.battery.discharging_min, 40);
        assert_eq!(config.battery.charging_min, 20);
        assert_eq!(config.paths.staging_dir, PathBuf::from("/data/ota_package"));
        config.validate().expect("defaults validate");
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let config: Config = toml::from_str(
            r#"
            [battery]
            discharging_min = 50
            "#,
        )
        .expect("parse");
        assert_eq!(config.battery.discharging_min, 50);
        assert_eq!(config.battery.charging_min, 20);
    }

    #[test]
    fn charging_threshold_above_discharging_is_rejected() {
        let config: Config = toml::from_str(
            r#"
            [battery]
            discharging_min = 20
            charging_min = 30
            "#,
        )
        .expect("parse");
        assert!(config.validate().is_err());
    }

    #[tokio::test]
    async fn load_or_default_without_file() {
        let td = tempfile::tempdir().expect("tempdir");
        let config = Config::load_or_default(&td.path().join("missing.toml"))
            .await
            .expect("load");
        assert_eq!(config.battery.discharging_min, 40);
    }

    #[tokio::test]
    async fn load_rejects_invalid_toml() {
        let td = tempfile::tempdir().expect("tempdir");
        let path = td.path().join("config.toml");
        std::fs::write(&path, "not = [valid").expect("write");
        assert!(Config::load(&path).await.is_err());
    }
}
