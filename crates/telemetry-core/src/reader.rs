use crate::{ChannelDescriptor, ReadError};
use power_sensor::{SensorAttribute, SensorChannel, SensorValue};

/// One channel's bus voltage and current. Both fields are always populated together.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Reading {
    pub bus_voltage_milli: i32,
    pub bus_current_milli: i32,
}

/// Runs the select, fetch, read sequence against a channel's device.
#[derive(Clone, Copy, Debug, Default)]
pub struct ChannelReader;

impl ChannelReader {
    pub fn new() -> Self {
        Self
    }

    /// Read one channel.
    ///
    /// Holds the device lock for the whole sequence so no other channel on the same
    /// device can change the selection between the select and the reads.
    pub fn read(&self, desc: &ChannelDescriptor) -> Result<Reading, ReadError> {
        let handle = desc.device();
        let device = || handle.name().to_string();
        let mut dev = handle
            .lock()
            .ok_or_else(|| ReadError::DeviceBusy { device: device() })?;
        if !dev.is_ready() {
            return Err(ReadError::DeviceNotReady { device: device() });
        }

        let selector = SensorValue::integer(i32::from(desc.channel_index()) + 1);
        dev.attr_set(SensorAttribute::SelectedChannel, selector)
            .map_err(|e| ReadError::AttributeSet {
                device: device(),
                code: e.code(),
            })?;

        dev.sample_fetch().map_err(|e| ReadError::SampleFetch {
            device: device(),
            code: e.code(),
        })?;

        let get = |quantity: SensorChannel| {
            dev.channel_get(quantity)
                .map_err(|e| ReadError::ChannelRead {
                    device: device(),
                    quantity,
                    code: e.code(),
                })
        };
        let vbus = get(SensorChannel::Voltage)?;
        let icur = get(SensorChannel::Current)?;

        Ok(Reading {
            bus_voltage_milli: vbus.to_milli(),
            bus_current_milli: icur.to_milli(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DeviceHandle;
    use power_sensor::{MockCall, MockDevice};

    fn channel(index: u8) -> (ChannelDescriptor, power_sensor::MockHandle) {
        let dev = MockDevice::new("ina1");
        let h = dev.handle();
        (ChannelDescriptor::new(DeviceHandle::new(dev), index, "t"), h)
    }

    #[test]
    fn test_sequence_and_one_based_selector() {
        let (desc, h) = channel(0);
        h.set_reading(1, 12_000, 500);
        let r = ChannelReader::new().read(&desc).unwrap();
        assert_eq!(
            r,
            Reading {
                bus_voltage_milli: 12_000,
                bus_current_milli: 500
            }
        );
        assert_eq!(
            h.calls(),
            vec![
                MockCall::AttrSet(SensorAttribute::SelectedChannel, SensorValue::integer(1)),
                MockCall::SampleFetch,
                MockCall::ChannelGet(SensorChannel::Voltage),
                MockCall::ChannelGet(SensorChannel::Current),
            ]
        );
    }

    #[test]
    fn test_selectors_stay_distinct_at_top_of_index_range() {
        let dev = MockDevice::new("ina1");
        let h = dev.handle();
        let handle = DeviceHandle::new(dev);
        let reader = ChannelReader::new();
        for index in [254u8, 255] {
            // the mock only has three channels, so these reads fail after the select
            let desc = ChannelDescriptor::new(handle.clone(), index, "t");
            assert!(reader.read(&desc).is_err());
        }
        assert_eq!(h.selections(), vec![255, 256]);
    }

    #[test]
    fn test_not_ready_fails_fast() {
        let (desc, h) = channel(1);
        h.set_ready(false);
        let err = ChannelReader::new().read(&desc).unwrap_err();
        assert_eq!(
            err,
            ReadError::DeviceNotReady {
                device: "ina1".into()
            }
        );
        assert!(h.calls().is_empty());
    }

    #[test]
    fn test_select_failure_aborts() {
        let (desc, h) = channel(2);
        h.fail_attr_set(Some(-16));
        let err = ChannelReader::new().read(&desc).unwrap_err();
        assert_eq!(err.code(), -16);
        assert!(matches!(err, ReadError::AttributeSet { .. }));
        assert_eq!(h.fetch_count(), 0);
    }

    #[test]
    fn test_fetch_failure_aborts() {
        let (desc, h) = channel(0);
        h.fail_fetch(Some(-5));
        let err = ChannelReader::new().read(&desc).unwrap_err();
        assert_eq!(
            err,
            ReadError::SampleFetch {
                device: "ina1".into(),
                code: -5
            }
        );
        assert!(!h
            .calls()
            .iter()
            .any(|c| matches!(c, MockCall::ChannelGet(_))));
    }

    #[test]
    fn test_voltage_failure_yields_no_reading() {
        let (desc, h) = channel(0);
        h.fail_voltage(Some(-11));
        let err = ChannelReader::new().read(&desc).unwrap_err();
        assert_eq!(
            err,
            ReadError::ChannelRead {
                device: "ina1".into(),
                quantity: SensorChannel::Voltage,
                code: -11
            }
        );
        // current is never read once voltage failed
        assert!(!h
            .calls()
            .contains(&MockCall::ChannelGet(SensorChannel::Current)));
    }

    #[test]
    fn test_current_failure_yields_no_reading() {
        let (desc, h) = channel(0);
        h.fail_current(Some(-5));
        let err = ChannelReader::new().read(&desc).unwrap_err();
        assert!(matches!(
            err,
            ReadError::ChannelRead {
                quantity: SensorChannel::Current,
                ..
            }
        ));
    }
}
