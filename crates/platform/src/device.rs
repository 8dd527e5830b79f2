//! Device identifier probes
//!
//! The device identifier is consumed by the caller to pre-filter candidate
//! packages whose display name carries the device codename. The install
//! controller itself never filters on it.

use otactl_errors::{Error, PlatformError};

/// Source of the opaque device identifier.
pub trait DeviceIdProvider: Send + Sync {
    /// The device codename, e.g. `"cheetah"`.
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::DeviceIdUnavailable` if the identifier
    /// cannot be determined.
    fn device_id(&self) -> Result<String, Error>;

    /// Whether a package display name mentions this device.
    ///
    /// # Errors
    ///
    /// Propagates the device identifier lookup failure.
    fn matches_package_name(&self, name: &str) -> Result<bool, Error> {
        let id = self.device_id()?;
        Ok(name.to_ascii_lowercase().contains(&id.to_ascii_lowercase()))
    }
}

/// Reads the device identifier from an environment variable.
#[derive(Debug, Clone)]
pub struct EnvDeviceId {
    var: String,
}

impl EnvDeviceId {
    /// Default environment variable consulted for the device codename.
    pub const DEFAULT_VAR: &'static str = "OTACTL_DEVICE";

    #[must_use]
    pub fn new() -> Self {
        Self::from_var(Self::DEFAULT_VAR)
    }

    #[must_use]
    pub fn from_var(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl Default for EnvDeviceId {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceIdProvider for EnvDeviceId {
    fn device_id(&self) -> Result<String, Error> {
        std::env::var(&self.var).map_err(|e| {
            PlatformError::DeviceIdUnavailable {
                message: format!("{}: {e}", self.var),
            }
            .into()
        })
    }
}

/// Fixed device identifier, for tests and simulators.
#[derive(Debug, Clone)]
pub struct StaticDeviceId(pub String);

impl DeviceIdProvider for StaticDeviceId {
    fn device_id(&self) -> Result<String, Error> {
        Ok(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_matching_is_case_insensitive() {
        let provider = StaticDeviceId("cheetah".to_string());
        assert!(provider
            .matches_package_name("ota-Cheetah-2026.08.01.zip")
            .expect("match"));
        assert!(!provider
            .matches_package_name("ota-panther-2026.08.01.zip")
            .expect("match"));
    }

    #[test]
    fn missing_env_var_is_unavailable() {
        let provider = EnvDeviceId::from_var("OTACTL_TEST_UNSET_DEVICE_VAR");
        assert!(provider.device_id().is_err());
    }
}
