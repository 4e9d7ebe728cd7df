use crate::{encode, ChannelReader, ChannelRegistry, Publisher, ReadError};
use pubsub_transport::{Topic, Transport};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SchedulerState {
    /// Between ticks.
    Idle,
    /// Iterating the registry.
    Polling,
}

/// Per-pass counters. Diagnostics only; a pass has no overall success or failure.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct CycleStats {
    pub published: usize,
    pub not_ready: usize,
    pub read_failures: usize,
    pub publish_failures: usize,
    pub truncated: usize,
}

/// Single-threaded poll loop: service the transport, then read, encode and publish
/// every channel in registry order, once per interval.
///
/// Channels are processed strictly one after another, which is what keeps reads on a
/// shared device from interleaving.
pub struct PollScheduler<T: Transport> {
    registry: ChannelRegistry,
    reader: ChannelReader,
    publisher: Publisher<T>,
    topic: Topic,
    interval: Duration,
    state: SchedulerState,
    cycles: u64,
}

impl<T: Transport> PollScheduler<T> {
    pub fn new(registry: ChannelRegistry, transport: T, topic: Topic, interval: Duration) -> Self {
        Self {
            registry,
            reader: ChannelReader::new(),
            publisher: Publisher::new(transport),
            topic,
            interval,
            state: SchedulerState::Idle,
            cycles: 0,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// One Polling pass over every channel. Returns to `Idle` when done.
    pub fn run_cycle(&mut self) -> CycleStats {
        self.state = SchedulerState::Polling;
        self.cycles += 1;
        let mut stats = CycleStats::default();

        // Keeps the session alive, so it runs even when there are no channels
        if let Err(e) = self.publisher.service() {
            warn!(error = %e, "transport service failed");
        }

        for desc in self.registry.iter() {
            let device = desc.device().name();
            let channel = desc.channel_index();

            match desc.device().check_ready() {
                Ok(()) => {}
                Err(ReadError::DeviceNotReady { .. }) => {
                    warn!(device, channel, "sensor device not ready");
                    stats.not_ready += 1;
                    continue;
                }
                Err(e) => {
                    warn!(device, channel, error = %e, "sensor device unavailable");
                    stats.read_failures += 1;
                    continue;
                }
            }

            let reading = match self.reader.read(desc) {
                Ok(r) => r,
                Err(e) => {
                    warn!(device, channel, code = e.code(), error = %e, "sensor read failed");
                    stats.read_failures += 1;
                    continue;
                }
            };

            let message = encode(desc.tag(), desc.channel_number(), &reading);
            if let Some(t) = message.truncation() {
                debug!(device, channel, natural_len = t.natural_len, "{t}");
                stats.truncated += 1;
            }
            debug!(tag = desc.tag(), payload = %message.to_text(), "sensor");

            match self.publisher.publish(&self.topic, &message) {
                Ok(()) => stats.published += 1,
                Err(e) => {
                    warn!(device, channel, topic = %self.topic.name, error = %e, "publish failed");
                    stats.publish_failures += 1;
                }
            }
        }

        self.state = SchedulerState::Idle;
        stats
    }

    /// One pass, then sleep out the rest of the interval unless `last`.
    fn tick(&mut self, last: bool) -> CycleStats {
        let started = Instant::now();
        let stats = self.run_cycle();
        debug!(cycle = self.cycles, ?stats, "poll cycle complete");
        if last {
            return stats;
        }
        // Fixed rate: an overrunning pass starts the next one immediately
        let rest = self.interval.saturating_sub(started.elapsed());
        if !rest.is_zero() {
            thread::sleep(rest);
        }
        stats
    }

    /// Poll for the lifetime of the process.
    pub fn run(&mut self) -> ! {
        loop {
            self.tick(false);
        }
    }

    /// Poll a fixed number of cycles, sleeping the interval between them.
    pub fn run_cycles(&mut self, n: u64) -> CycleStats {
        let mut total = CycleStats::default();
        for i in 0..n {
            let s = self.tick(i + 1 == n);
            total.published += s.published;
            total.not_ready += s.not_ready;
            total.read_failures += s.read_failures;
            total.publish_failures += s.publish_failures;
            total.truncated += s.truncated;
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ChannelDescriptor, DeviceHandle};
    use power_sensor::{MockDevice, MockHandle};
    use pubsub_transport::{MockTransport, QoS};

    fn scheduler(channels: &[u8]) -> (PollScheduler<MockTransport>, MockHandle, pubsub_transport::MockHandle) {
        let dev = MockDevice::new("ina1");
        let dh = dev.handle();
        let handle = DeviceHandle::new(dev);
        let descs = channels
            .iter()
            .map(|i| ChannelDescriptor::new(handle.clone(), *i, &format!("ch{i}")))
            .collect();
        let transport = MockTransport::new();
        let th = transport.handle();
        let s = PollScheduler::new(
            ChannelRegistry::new(descs),
            transport,
            Topic::new("t", QoS::AtLeastOnce),
            Duration::ZERO,
        );
        (s, dh, th)
    }

    #[test]
    fn test_state_returns_to_idle() {
        let (mut s, _, _) = scheduler(&[0]);
        assert_eq!(s.state(), SchedulerState::Idle);
        s.run_cycle();
        assert_eq!(s.state(), SchedulerState::Idle);
        assert_eq!(s.cycles(), 1);
    }

    #[test]
    fn test_services_transport_with_no_channels() {
        let (mut s, _, th) = scheduler(&[]);
        let stats = s.run_cycles(3);
        assert_eq!(th.service_calls(), 3);
        assert_eq!(th.publish_calls(), 0);
        assert_eq!(stats, CycleStats::default());
    }

    #[test]
    fn test_service_failure_does_not_stop_pass() {
        let (mut s, _, th) = scheduler(&[0, 1]);
        th.fail_service(Some(pubsub_transport::TransportError::NotConnected));
        let stats = s.run_cycle();
        assert_eq!(stats.published, 2);
    }

    #[test]
    fn test_run_cycles_skips_sleep_after_last_cycle() {
        let transport = MockTransport::new();
        let mut s = PollScheduler::new(
            ChannelRegistry::default(),
            transport,
            Topic::new("t", QoS::AtLeastOnce),
            Duration::from_millis(300),
        );
        let started = Instant::now();
        s.run_cycles(2);
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(300));
        assert!(elapsed < Duration::from_millis(600));
        assert_eq!(s.cycles(), 2);
    }

    #[test]
    fn test_poisoned_device_lock_counts_as_read_failure() {
        let (mut s, dh, th) = scheduler(&[0, 1]);
        let handle = s.registry.get(0).unwrap().device().clone();
        let _ = std::thread::spawn(move || {
            let _guard = handle.lock();
            panic!("poison the device lock");
        })
        .join();

        let stats = s.run_cycle();
        assert_eq!(stats.read_failures, 2);
        assert_eq!(stats.not_ready, 0);
        assert_eq!(th.publish_calls(), 0);
        assert!(dh.calls().is_empty());
    }

    #[test]
    fn test_read_failure_is_isolated() {
        let (mut s, dh, th) = scheduler(&[0, 1, 2]);
        dh.fail_attr_set(Some(-5));
        let stats = s.run_cycle();
        assert_eq!(stats.read_failures, 3);
        assert_eq!(th.publish_calls(), 0);

        dh.fail_attr_set(None);
        let stats = s.run_cycle();
        assert_eq!(stats.published, 3);
        assert_eq!(dh.selections(), vec![1, 2, 3, 1, 2, 3]);
    }

    #[test]
    fn test_truncated_messages_are_still_sent() {
        let dev = MockDevice::new("ina1");
        let handle = DeviceHandle::new(dev);
        let long_tag = "x".repeat(300);
        let transport = MockTransport::new();
        let th = transport.handle();
        let mut s = PollScheduler::new(
            ChannelRegistry::new(vec![ChannelDescriptor::new(handle, 0, &long_tag)]),
            transport,
            Topic::new("t", QoS::AtLeastOnce),
            Duration::ZERO,
        );
        let stats = s.run_cycle();
        assert_eq!(stats.truncated, 1);
        assert_eq!(stats.published, 1);
        assert_eq!(th.published()[0].payload.len(), 255);
    }
}
