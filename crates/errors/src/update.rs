//! Install-flow error types

use std::borrow::Cow;

use thiserror::Error;

use crate::UserFacingError;

/// Errors produced by the update install flow.
///
/// Every kind is terminal for the session that produced it. Nothing here
/// triggers an automatic retry; the caller must start a fresh session after
/// addressing the cause.
#[derive(Debug, Clone, Error)]
pub enum UpdateError {
    #[error("update package not found: {reference}")]
    NotFound { reference: String },

    #[error("staging failed: {message}")]
    StagingFailed { message: String },

    #[error("invalid update package {path}: {message}")]
    InvalidPackage { path: String, message: String },

    #[error("not a readable archive {path}: {message}")]
    NotAnArchive { path: String, message: String },

    #[error(
        "battery too low: {percent}% (need {discharging_min}% discharging, {charging_min}% charging)"
    )]
    BatteryLow {
        percent: u8,
        charging: bool,
        discharging_min: u8,
        charging_min: u8,
    },

    #[error("installer failed: {message}")]
    InstallFailed { message: String },

    #[error("update verification failed: {message}")]
    VerificationFailed { message: String },

    #[error("installation cancelled by user")]
    Cancelled,

    #[error("an install session is already active")]
    SessionActive,

    #[error("no confirmation is pending")]
    NotAwaitingConfirmation,
}

impl UserFacingError for UpdateError {
    fn user_message(&self) -> Cow<'_, str> {
        match self {
            Self::NotFound { reference } => {
                Cow::Owned(format!("The selected update package could not be opened: {reference}"))
            }
            Self::StagingFailed { message } => {
                Cow::Owned(format!("Copying the update package failed: {message}"))
            }
            Self::InvalidPackage { .. } | Self::NotAnArchive { .. } => {
                Cow::Borrowed("The selected file is not a valid update package.")
            }
            Self::BatteryLow {
                percent,
                charging,
                discharging_min,
                charging_min,
            } => {
                let state = if *charging { "charging" } else { "discharging" };
                Cow::Owned(format!(
                    "Battery charge is too low to install this update: {percent}% while {state}. \
                     At least {discharging_min}% is required, or {charging_min}% while charging."
                ))
            }
            Self::InstallFailed { message } => {
                Cow::Owned(format!("The installer reported an error: {message}"))
            }
            Self::VerificationFailed { message } => {
                Cow::Owned(format!("The update package failed verification: {message}"))
            }
            Self::Cancelled => Cow::Borrowed("Installation was cancelled."),
            Self::SessionActive => {
                Cow::Borrowed("Another update installation is already in progress.")
            }
            Self::NotAwaitingConfirmation => {
                Cow::Borrowed("There is no pending installation to confirm.")
            }
        }
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::NotFound { .. } => Some("Pick the update package again from storage."),
            Self::StagingFailed { .. } => {
                Some("Check free space on the staging partition and retry.")
            }
            Self::InvalidPackage { .. } | Self::NotAnArchive { .. } => {
                Some("Pick an update package built for this device.")
            }
            Self::BatteryLow { .. } => {
                Some("Connect the charger or charge the device, then try again.")
            }
            Self::SessionActive => Some("Wait for the current installation to finish."),
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::StagingFailed { .. } | Self::SessionActive | Self::NotAwaitingConfirmation
        )
    }

    fn user_code(&self) -> Option<&'static str> {
        Some(match self {
            Self::NotFound { .. } => "update.not_found",
            Self::StagingFailed { .. } => "update.staging_failed",
            Self::InvalidPackage { .. } => "update.invalid_package",
            Self::NotAnArchive { .. } => "update.not_an_archive",
            Self::BatteryLow { .. } => "update.battery_low",
            Self::InstallFailed { .. } => "update.install_failed",
            Self::VerificationFailed { .. } => "update.verification_failed",
            Self::Cancelled => "update.cancelled",
            Self::SessionActive => "update.session_active",
            Self::NotAwaitingConfirmation => "update.not_awaiting_confirmation",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn battery_low_message_names_both_thresholds() {
        let err = UpdateError::BatteryLow {
            percent: 19,
            charging: false,
            discharging_min: 20,
            charging_min: 15,
        };
        let message = err.user_message();
        assert!(message.contains("19%"));
        assert!(message.contains("20%"));
        assert!(message.contains("15%"));
    }

    #[test]
    fn codes_are_stable() {
        assert_eq!(UpdateError::Cancelled.user_code(), Some("update.cancelled"));
        assert_eq!(
            UpdateError::SessionActive.user_code(),
            Some("update.session_active")
        );
    }
}
