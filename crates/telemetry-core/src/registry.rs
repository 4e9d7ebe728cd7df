use crate::config::{BoardConfig, DeviceConfig, DriverConfig};
use crate::{ConfigError, ReadError};
use power_sensor::{
    DeviceError, SensorAttribute, SensorChannel, SensorDevice, SensorValue,
};
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info, warn};

type BoxedDevice = Box<dyn SensorDevice + Send>;

/// Shared handle onto one physical sensor.
///
/// Every channel on a device holds a clone; the mutex serializes the device's
/// channel-selection state across them.
#[derive(Clone)]
pub struct DeviceHandle {
    name: Arc<str>,
    inner: Arc<Mutex<BoxedDevice>>,
}

impl DeviceHandle {
    pub fn new(device: impl SensorDevice + Send + 'static) -> Self {
        Self::from_boxed(Box::new(device))
    }

    pub fn from_boxed(device: BoxedDevice) -> Self {
        Self {
            name: Arc::from(device.name()),
            inner: Arc::new(Mutex::new(device)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn lock(&self) -> Option<std::sync::MutexGuard<'_, BoxedDevice>> {
        self.inner.lock().ok()
    }

    /// Readiness probe. A poisoned device lock is reported as `DeviceBusy`.
    pub fn check_ready(&self) -> Result<(), ReadError> {
        let dev = self.lock().ok_or_else(|| ReadError::DeviceBusy {
            device: self.name.to_string(),
        })?;
        if dev.is_ready() {
            Ok(())
        } else {
            Err(ReadError::DeviceNotReady {
                device: self.name.to_string(),
            })
        }
    }

    pub fn is_ready(&self) -> bool {
        self.check_ready().is_ok()
    }
}

impl fmt::Debug for DeviceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceHandle")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// One physical channel on a sensor device.
#[derive(Clone, Debug)]
pub struct ChannelDescriptor {
    device: DeviceHandle,
    channel_index: u8,
    tag: Arc<str>,
}

impl ChannelDescriptor {
    pub fn new(device: DeviceHandle, channel_index: u8, tag: &str) -> Self {
        Self {
            device,
            channel_index,
            tag: Arc::from(tag),
        }
    }

    pub fn device(&self) -> &DeviceHandle {
        &self.device
    }

    pub fn channel_index(&self) -> u8 {
        self.channel_index
    }

    /// 1-based channel number as selected on the device and reported on the wire.
    pub fn channel_number(&self) -> u16 {
        u16::from(self.channel_index) + 1
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }
}

/// Ordered, fixed list of channels to poll. Built once; read-only afterwards.
#[derive(Clone, Debug, Default)]
pub struct ChannelRegistry {
    channels: Vec<ChannelDescriptor>,
}

impl ChannelRegistry {
    pub fn new(channels: Vec<ChannelDescriptor>) -> Self {
        Self { channels }
    }

    /// Build the registry from board configuration, opening each enabled device once.
    ///
    /// The configuration is validated first. A device that fails to open is kept as an
    /// offline placeholder, so its channels stay in the registry and report not-ready
    /// every cycle.
    pub fn from_config<F>(cfg: &BoardConfig, mut open: F) -> Result<Self, ConfigError>
    where
        F: FnMut(&DeviceConfig) -> power_sensor::Result<BoxedDevice>,
    {
        cfg.validate()?;
        let mut channels = Vec::with_capacity(cfg.enabled_channel_count());
        for dev_cfg in &cfg.devices {
            if !dev_cfg.enabled {
                debug!(device = %dev_cfg.name, "device disabled; skipping");
                continue;
            }
            let device = match open(dev_cfg) {
                Ok(dev) => DeviceHandle::from_boxed(dev),
                Err(e) => {
                    error!(device = %dev_cfg.name, code = e.code(), error = %e, "failed to open device");
                    DeviceHandle::new(OfflineDevice {
                        name: dev_cfg.name.clone(),
                    })
                }
            };
            for ch in &dev_cfg.channels {
                channels.push(ChannelDescriptor::new(
                    device.clone(),
                    ch.index,
                    ch.resolve_tag(),
                ));
            }
        }
        let registry = Self { channels };
        if registry.is_empty() {
            warn!("no sensor channels defined in board config");
        }
        info!(count = registry.count(), "sensor channels registered");
        Ok(registry)
    }

    pub fn count(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&ChannelDescriptor> {
        self.channels.get(idx)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChannelDescriptor> {
        self.channels.iter()
    }
}

/// Open the backend named by a device's driver entry.
pub fn open_device(cfg: &DeviceConfig) -> power_sensor::Result<BoxedDevice> {
    match &cfg.driver {
        #[cfg(feature = "mock")]
        DriverConfig::Mock => Ok(Box::new(power_sensor::MockDevice::new(&cfg.name))),
        #[cfg(not(feature = "mock"))]
        DriverConfig::Mock => Err(DeviceError::Unsupported("built without the mock backend")),
        #[cfg(feature = "hwmon")]
        DriverConfig::Hwmon { path } => {
            Ok(Box::new(power_sensor::HwmonDevice::open(&cfg.name, path)?))
        }
        #[cfg(not(feature = "hwmon"))]
        DriverConfig::Hwmon { .. } => {
            Err(DeviceError::Unsupported("built without the hwmon backend"))
        }
    }
}

/// Stand-in for a device that could not be opened.
struct OfflineDevice {
    name: String,
}

impl SensorDevice for OfflineDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_ready(&self) -> bool {
        false
    }

    fn attr_set(&mut self, _attr: SensorAttribute, _value: SensorValue) -> power_sensor::Result<()> {
        Err(DeviceError::NotFound(self.name.clone()))
    }

    fn sample_fetch(&mut self) -> power_sensor::Result<()> {
        Err(DeviceError::NotFound(self.name.clone()))
    }

    fn channel_get(&self, _chan: SensorChannel) -> power_sensor::Result<SensorValue> {
        Err(DeviceError::NotFound(self.name.clone()))
    }
}
