//! Battery status probes

use std::path::{Path, PathBuf};

use otactl_errors::{Error, PlatformError};
use otactl_types::BatteryStatus;

/// Source of live battery state.
///
/// The precondition gate reads this immediately before committing to an
/// install, so implementations should return the current reading rather
/// than a cached one.
pub trait BatteryProvider: Send + Sync {
    /// Read the current battery status.
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::BatteryUnavailable` if the reading cannot be
    /// taken.
    fn status(&self) -> Result<BatteryStatus, Error>;
}

/// Reads battery state from the Linux power-supply sysfs interface.
#[derive(Debug, Clone)]
pub struct SysfsBattery {
    supply_dir: PathBuf,
}

impl SysfsBattery {
    /// Default power-supply node on the target platform.
    pub const DEFAULT_SUPPLY_DIR: &'static str = "/sys/class/power_supply/battery";

    /// Probe the default power-supply node.
    #[must_use]
    pub fn new() -> Self {
        Self::at(Self::DEFAULT_SUPPLY_DIR)
    }

    /// Probe a specific power-supply node.
    #[must_use]
    pub fn at(supply_dir: impl Into<PathBuf>) -> Self {
        Self {
            supply_dir: supply_dir.into(),
        }
    }

    fn read_trimmed(path: &Path) -> Result<String, Error> {
        let raw = std::fs::read_to_string(path).map_err(|e| PlatformError::BatteryUnavailable {
            message: format!("{}: {e}", path.display()),
        })?;
        Ok(raw.trim().to_string())
    }
}

impl Default for SysfsBattery {
    fn default() -> Self {
        Self::new()
    }
}

impl BatteryProvider for SysfsBattery {
    fn status(&self) -> Result<BatteryStatus, Error> {
        let capacity = Self::read_trimmed(&self.supply_dir.join("capacity"))?;
        let percent: u8 = capacity
            .parse()
            .map_err(|_| PlatformError::BatteryUnavailable {
                message: format!("unparseable capacity reading: {capacity:?}"),
            })?;

        // "Full" counts as charging: the device is on external power.
        let state = Self::read_trimmed(&self.supply_dir.join("status"))?;
        let charging = matches!(state.as_str(), "Charging" | "Full");

        tracing::debug!(percent, charging, "battery status read");
        Ok(BatteryStatus {
            percent: percent.min(100),
            charging,
        })
    }
}

/// Fixed battery reading, for tests and simulators.
#[derive(Debug, Clone, Copy)]
pub struct StaticBattery(pub BatteryStatus);

impl BatteryProvider for StaticBattery {
    fn status(&self) -> Result<BatteryStatus, Error> {
        Ok(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_supply(dir: &Path, capacity: &str, status: &str) {
        std::fs::write(dir.join("capacity"), capacity).expect("capacity");
        std::fs::write(dir.join("status"), status).expect("status");
    }

    #[test]
    fn reads_charging_state_from_sysfs() {
        let td = tempfile::tempdir().expect("tempdir");
        write_supply(td.path(), "57\n", "Charging\n");

        let status = SysfsBattery::at(td.path()).status().expect("status");
        assert_eq!(status.percent, 57);
        assert!(status.charging);
    }

    #[test]
    fn full_counts_as_charging() {
        let td = tempfile::tempdir().expect("tempdir");
        write_supply(td.path(), "100\n", "Full\n");

        let status = SysfsBattery::at(td.path()).status().expect("status");
        assert!(status.charging);
    }

    #[test]
    fn discharging_state() {
        let td = tempfile::tempdir().expect("tempdir");
        write_supply(td.path(), "33\n", "Discharging\n");

        let status = SysfsBattery::at(td.path()).status().expect("status");
        assert_eq!(status.percent, 33);
        assert!(!status.charging);
    }

    #[test]
    fn missing_node_is_unavailable() {
        let td = tempfile::tempdir().expect("tempdir");
        let result = SysfsBattery::at(td.path().join("nope")).status();
        assert!(matches!(
            result,
            Err(Error::Platform(PlatformError::BatteryUnavailable { .. }))
        ));
    }

    #[test]
    fn garbage_capacity_is_unavailable() {
        let td = tempfile::tempdir().expect("tempdir");
        write_supply(td.path(), "many\n", "Charging\n");
        assert!(SysfsBattery::at(td.path()).status().is_err());
    }
}
