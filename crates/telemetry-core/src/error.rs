use power_sensor::SensorChannel;
use pubsub_transport::TransportError;
use thiserror::Error;

/// Failure of one channel's select, fetch and read sequence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReadError {
    #[error("device not ready: {device}")]
    DeviceNotReady { device: String },
    #[error("device lock poisoned: {device}")]
    DeviceBusy { device: String },
    #[error("{device}: channel select failed (rc={code})")]
    AttributeSet { device: String, code: i32 },
    #[error("{device}: sample fetch failed (rc={code})")]
    SampleFetch { device: String, code: i32 },
    #[error("{device}: {quantity} read failed (rc={code})")]
    ChannelRead {
        device: String,
        quantity: SensorChannel,
        code: i32,
    },
}

impl ReadError {
    /// Underlying errno-style cause, 0 where the failure has none.
    pub fn code(&self) -> i32 {
        match self {
            ReadError::DeviceNotReady { .. } | ReadError::DeviceBusy { .. } => 0,
            ReadError::AttributeSet { code, .. }
            | ReadError::SampleFetch { code, .. }
            | ReadError::ChannelRead { code, .. } => *code,
        }
    }
}

/// The transport did not accept a message for delivery on this attempt.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("publish to {topic} failed: {source}")]
pub struct PublishError {
    pub topic: String,
    #[source]
    pub source: TransportError,
}

/// A payload was cut to fit its buffer. Diagnostic only; the message is still sent.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("payload truncated from {natural_len} to {} bytes", .capacity - 1)]
pub struct EncodeTruncated {
    pub natural_len: usize,
    pub capacity: usize,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("duplicate device name: {0}")]
    DuplicateDevice(String),
    #[error("device {device}: duplicate channel index {index}")]
    DuplicateChannel { device: String, index: u8 },
    #[error("poll interval must be non-zero")]
    ZeroInterval,
    #[error("topic name must not be empty")]
    EmptyTopic,
    #[error("device name must not be empty")]
    EmptyDeviceName,
}
