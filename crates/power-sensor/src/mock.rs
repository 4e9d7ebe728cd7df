use crate::error::errno;
use crate::{DeviceError, Result, SensorAttribute, SensorChannel, SensorDevice, SensorValue};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Calls observed by a [`MockDevice`], in order.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MockCall {
    AttrSet(SensorAttribute, SensorValue),
    SampleFetch,
    ChannelGet(SensorChannel),
}

#[derive(Debug, Default)]
struct MockState {
    ready: bool,
    selected: u8,
    readings: HashMap<u8, (SensorValue, SensorValue)>,
    buffered: Option<(SensorValue, SensorValue)>,
    fetch_count: u64,
    fail_attr_set: Option<i32>,
    fail_fetch: Option<i32>,
    fail_voltage: Option<i32>,
    fail_current: Option<i32>,
    calls: Vec<MockCall>,
}

/// A simple in-process three-channel power monitor.
///
/// Channels without a scripted reading report a synthetic value derived from the
/// channel number, so a mock board produces plausible telemetry out of the box.
pub struct MockDevice {
    name: String,
    state: Arc<Mutex<MockState>>,
}

/// Test-side handle onto a [`MockDevice`]'s state, valid after the device is moved.
#[derive(Clone)]
pub struct MockHandle {
    state: Arc<Mutex<MockState>>,
}

pub const MOCK_CHANNELS: u8 = 3;

fn lock(state: &Mutex<MockState>) -> MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockDevice {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            state: Arc::new(Mutex::new(MockState {
                ready: true,
                ..MockState::default()
            })),
        }
    }

    pub fn handle(&self) -> MockHandle {
        MockHandle {
            state: Arc::clone(&self.state),
        }
    }
}

impl MockHandle {
    pub fn set_ready(&self, ready: bool) {
        lock(&self.state).ready = ready;
    }

    /// Script the reading returned for a 1-based channel number, in milli-units.
    pub fn set_reading(&self, channel_number: u8, v_bus_mv: i32, i_bus_ma: i32) {
        lock(&self.state).readings.insert(
            channel_number,
            (
                SensorValue::from_milli(v_bus_mv),
                SensorValue::from_milli(i_bus_ma),
            ),
        );
    }

    pub fn fail_attr_set(&self, code: Option<i32>) {
        lock(&self.state).fail_attr_set = code;
    }

    pub fn fail_fetch(&self, code: Option<i32>) {
        lock(&self.state).fail_fetch = code;
    }

    pub fn fail_voltage(&self, code: Option<i32>) {
        lock(&self.state).fail_voltage = code;
    }

    pub fn fail_current(&self, code: Option<i32>) {
        lock(&self.state).fail_current = code;
    }

    pub fn calls(&self) -> Vec<MockCall> {
        lock(&self.state).calls.clone()
    }

    /// Channel numbers written to the selection attribute, in order.
    pub fn selections(&self) -> Vec<i32> {
        lock(&self.state)
            .calls
            .iter()
            .filter_map(|c| match c {
                MockCall::AttrSet(SensorAttribute::SelectedChannel, v) => Some(v.val1),
                _ => None,
            })
            .collect()
    }

    pub fn fetch_count(&self) -> u64 {
        lock(&self.state).fetch_count
    }
}

fn synthetic(channel_number: u8, fetch_count: u64) -> (SensorValue, SensorValue) {
    // Small ripple so consecutive samples are distinguishable in logs
    let ripple = (fetch_count % 5) as i32;
    let mv = 3300 + i32::from(channel_number) * 1700 + ripple;
    let ma = 100 * i32::from(channel_number) + ripple;
    (SensorValue::from_milli(mv), SensorValue::from_milli(ma))
}

impl SensorDevice for MockDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_ready(&self) -> bool {
        lock(&self.state).ready
    }

    fn attr_set(&mut self, attr: SensorAttribute, value: SensorValue) -> Result<()> {
        let mut st = lock(&self.state);
        st.calls.push(MockCall::AttrSet(attr, value));
        if let Some(code) = st.fail_attr_set {
            return Err(DeviceError::Code(code));
        }
        match attr {
            SensorAttribute::SelectedChannel => {
                let n = u8::try_from(value.val1)
                    .ok()
                    .filter(|n| *n <= MOCK_CHANNELS)
                    .ok_or(DeviceError::Code(-errno::EINVAL))?;
                st.selected = n;
                Ok(())
            }
        }
    }

    fn sample_fetch(&mut self) -> Result<()> {
        let mut st = lock(&self.state);
        st.calls.push(MockCall::SampleFetch);
        if let Some(code) = st.fail_fetch {
            return Err(DeviceError::Code(code));
        }
        if st.selected == 0 {
            return Err(DeviceError::Code(-errno::EINVAL));
        }
        st.fetch_count += 1;
        let sample = st
            .readings
            .get(&st.selected)
            .copied()
            .unwrap_or_else(|| synthetic(st.selected, st.fetch_count));
        st.buffered = Some(sample);
        Ok(())
    }

    fn channel_get(&self, chan: SensorChannel) -> Result<SensorValue> {
        let mut st = lock(&self.state);
        st.calls.push(MockCall::ChannelGet(chan));
        let (voltage, current) = st.buffered.ok_or(DeviceError::Code(-errno::EAGAIN))?;
        match chan {
            SensorChannel::Voltage => match st.fail_voltage {
                Some(code) => Err(DeviceError::Code(code)),
                None => Ok(voltage),
            },
            SensorChannel::Current => match st.fail_current {
                Some(code) => Err(DeviceError::Code(code)),
                None => Ok(current),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_fetch_get() {
        let mut dev = MockDevice::new("ina1");
        let h = dev.handle();
        h.set_reading(2, 12_000, 500);
        dev.attr_set(SensorAttribute::SelectedChannel, SensorValue::integer(2))
            .unwrap();
        dev.sample_fetch().unwrap();
        assert_eq!(dev.channel_get(SensorChannel::Voltage).unwrap().to_milli(), 12_000);
        assert_eq!(dev.channel_get(SensorChannel::Current).unwrap().to_milli(), 500);
        assert_eq!(h.selections(), vec![2]);
        assert_eq!(h.fetch_count(), 1);
    }

    #[test]
    fn test_fetch_without_selection_fails() {
        let mut dev = MockDevice::new("ina1");
        assert_eq!(dev.sample_fetch(), Err(DeviceError::Code(-errno::EINVAL)));
    }

    #[test]
    fn test_out_of_range_selection_rejected() {
        let mut dev = MockDevice::new("ina1");
        let res = dev.attr_set(SensorAttribute::SelectedChannel, SensorValue::integer(4));
        assert!(res.is_err());
    }

    #[test]
    fn test_injected_failures() {
        let mut dev = MockDevice::new("ina1");
        let h = dev.handle();
        h.fail_current(Some(-5));
        dev.attr_set(SensorAttribute::SelectedChannel, SensorValue::integer(1))
            .unwrap();
        dev.sample_fetch().unwrap();
        assert!(dev.channel_get(SensorChannel::Voltage).is_ok());
        assert_eq!(dev.channel_get(SensorChannel::Current), Err(DeviceError::Code(-5)));
    }

    #[test]
    fn test_readiness_toggle() {
        let dev = MockDevice::new("ina1");
        assert!(dev.is_ready());
        dev.handle().set_ready(false);
        assert!(!dev.is_ready());
    }
}
