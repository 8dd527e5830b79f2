#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Core type definitions for the otactl update install controller
//!
//! This crate provides the fundamental types used throughout the system:
//! the staged package model, install strategies, battery state, and the
//! session lifecycle states published to observers.

pub mod battery;
pub mod package;
pub mod session;

// Re-export commonly used types
pub use battery::{BatteryPolicy, BatteryStatus, PreconditionResult};
pub use package::{InstallStrategy, StagedPackage};
pub use session::{FailureKind, SessionSnapshot, SessionState};
pub use uuid::Uuid;
