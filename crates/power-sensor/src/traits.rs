use crate::{Result, SensorAttribute, SensorChannel, SensorValue};

/// A minimal blocking sensor device interface.
///
/// Channel selection lives on the device, so callers that share one device between
/// several channels must serialize the select, fetch and get calls themselves.
pub trait SensorDevice {
    /// Device name used in logs (e.g., "ina1").
    fn name(&self) -> &str;

    /// Whether the device has been initialized and can be sampled.
    fn is_ready(&self) -> bool;

    /// Write a device attribute.
    fn attr_set(&mut self, attr: SensorAttribute, value: SensorValue) -> Result<()>;

    /// Pull the latest measurement into the device's internal buffers.
    fn sample_fetch(&mut self) -> Result<()>;

    /// Read one quantity from the last fetched sample.
    fn channel_get(&self, chan: SensorChannel) -> Result<SensorValue>;
}
