//! Battery state and install precondition types

use serde::{Deserialize, Serialize};

/// A battery reading from the platform provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatteryStatus {
    /// Charge level, 0..=100.
    pub percent: u8,
    /// Whether the device is currently on external power.
    pub charging: bool,
}

/// Minimum charge thresholds for committing to an install.
///
/// The charging threshold is the lower of the two: a device on external
/// power can safely start from a lower charge level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatteryPolicy {
    /// Minimum charge percentage while discharging.
    pub discharging_min: u8,
    /// Minimum charge percentage while charging.
    pub charging_min: u8,
}

/// Outcome of the precondition gate.
///
/// Recomputed on every install attempt; never cached across attempts,
/// because battery state can change between user actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum PreconditionResult {
    /// Environment state allows installation.
    Pass,
    /// Battery charge is below the applicable threshold. Carries the live
    /// reading and both thresholds so the caller can render an explanation.
    BatteryLow {
        status: BatteryStatus,
        policy: BatteryPolicy,
    },
}

impl PreconditionResult {
    /// Whether the gate passed.
    #[must_use]
    pub fn passed(&self) -> bool {
        matches!(self, Self::Pass)
    }
}
