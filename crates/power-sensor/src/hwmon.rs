use crate::error::errno;
use crate::{DeviceError, Result, SensorAttribute, SensorChannel, SensorDevice, SensorValue};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// INA3221 exposed through the Linux hwmon sysfs interface.
///
/// The kernel driver publishes `in{N}_input` (bus voltage, mV) and `curr{N}_input`
/// (current, mA) for N in 1..=3. Selection is kept in-process; `sample_fetch` reads the
/// selected channel's attribute files into the sample buffer.
pub struct HwmonDevice {
    name: String,
    root: PathBuf,
    selected: u8,
    buffered: Option<(SensorValue, SensorValue)>,
}

const HWMON_CHANNELS: u8 = 3;

impl HwmonDevice {
    pub fn open(name: &str, root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(DeviceError::NotFound(root.display().to_string()));
        }
        Ok(Self {
            name: name.to_string(),
            root,
            selected: 0,
            buffered: None,
        })
    }

    fn read_milli(&self, file: &str) -> Result<i32> {
        let path = self.root.join(file);
        let raw = fs::read_to_string(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => DeviceError::NotFound(path.display().to_string()),
            ErrorKind::WouldBlock => DeviceError::Code(-errno::EAGAIN),
            _ => DeviceError::Io(format!("{}: {e}", path.display())),
        })?;
        raw.trim()
            .parse::<i32>()
            .map_err(|_| DeviceError::Io(format!("{}: not an integer", path.display())))
    }
}

impl SensorDevice for HwmonDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_ready(&self) -> bool {
        self.root.join("name").is_file()
    }

    fn attr_set(&mut self, attr: SensorAttribute, value: SensorValue) -> Result<()> {
        match attr {
            SensorAttribute::SelectedChannel => {
                let n = u8::try_from(value.val1)
                    .ok()
                    .filter(|n| (1..=HWMON_CHANNELS).contains(n))
                    .ok_or_else(|| {
                        DeviceError::InvalidArgument(format!("channel {}", value.val1))
                    })?;
                self.selected = n;
                Ok(())
            }
        }
    }

    fn sample_fetch(&mut self) -> Result<()> {
        if self.selected == 0 {
            return Err(DeviceError::InvalidArgument("no channel selected".into()));
        }
        let mv = self.read_milli(&format!("in{}_input", self.selected))?;
        let ma = self.read_milli(&format!("curr{}_input", self.selected))?;
        debug!(device = %self.name, channel = self.selected, mv, ma, "hwmon sample");
        self.buffered = Some((SensorValue::from_milli(mv), SensorValue::from_milli(ma)));
        Ok(())
    }

    fn channel_get(&self, chan: SensorChannel) -> Result<SensorValue> {
        let (voltage, current) = self.buffered.ok_or(DeviceError::Code(-errno::EAGAIN))?;
        match chan {
            SensorChannel::Voltage => Ok(voltage),
            SensorChannel::Current => Ok(current),
        }
    }
}
