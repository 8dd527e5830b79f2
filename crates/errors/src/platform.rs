//! Platform probe error types

use thiserror::Error;

use crate::UserFacingError;

#[derive(Debug, Clone, Error)]
pub enum PlatformError {
    #[error("battery status unavailable: {message}")]
    BatteryUnavailable { message: String },

    #[error("device identifier unavailable: {message}")]
    DeviceIdUnavailable { message: String },
}

impl UserFacingError for PlatformError {
    fn user_message(&self) -> std::borrow::Cow<'_, str> {
        match self {
            Self::BatteryUnavailable { .. } => {
                std::borrow::Cow::Borrowed("The battery state could not be read.")
            }
            Self::DeviceIdUnavailable { .. } => {
                std::borrow::Cow::Borrowed("The device identifier could not be determined.")
            }
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(self, Self::BatteryUnavailable { .. })
    }

    fn user_code(&self) -> Option<&'static str> {
        Some(match self {
            Self::BatteryUnavailable { .. } => "platform.battery_unavailable",
            Self::DeviceIdUnavailable { .. } => "platform.device_id_unavailable",
        })
    }
}
