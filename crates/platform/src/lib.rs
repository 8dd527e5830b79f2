#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Platform probes for the otactl update install controller
//!
//! Thin trait seams over the environment state the controller (and its
//! caller) consume: live battery status and the device identifier used by
//! the caller to pre-filter update packages by name. The controller itself
//! never filters; it only gates on battery state.

pub mod battery;
pub mod device;

pub use battery::{BatteryProvider, StaticBattery, SysfsBattery};
pub use device::{DeviceIdProvider, EnvDeviceId, StaticDeviceId};
