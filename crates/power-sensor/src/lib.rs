//! power-sensor: device abstraction for multi-channel power monitors
//!
//! This crate provides the trait and value types used to talk to INA3221-style sensors,
//! with feature-gated backends. The default build enables a `mock` backend so that
//! binaries can compile and run on any host without the kernel driver.

mod types;
pub use types::{SensorAttribute, SensorChannel, SensorValue};

mod error;
pub use error::{DeviceError, Result};

mod traits;
pub use traits::SensorDevice;

#[cfg(feature = "mock")]
mod mock;

#[cfg(feature = "mock")]
pub use mock::{MockCall, MockDevice, MockHandle};

#[cfg(feature = "hwmon")]
mod hwmon;

#[cfg(feature = "hwmon")]
pub use hwmon::HwmonDevice;
