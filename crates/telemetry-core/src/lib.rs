//! telemetry-core: sensor polling and telemetry publishing pipeline
//!
//! Builds an immutable registry of power-monitor channels from board configuration,
//! then polls every channel once per interval: select, sample and read on the device,
//! render a bounded text record, and hand it to the pub/sub transport. Every failure is
//! contained to the channel and cycle it happened in.

mod error;
pub use error::{ConfigError, EncodeTruncated, PublishError, ReadError};

pub mod config;
pub use config::{
    load_config_file, BoardConfig, ChannelConfig, DeviceConfig, DriverConfig, MqttConfig,
    PollConfig,
};

mod registry;
pub use registry::{open_device, ChannelDescriptor, ChannelRegistry, DeviceHandle};

mod reader;
pub use reader::{ChannelReader, Reading};

mod encoder;
pub use encoder::{encode, PayloadBuffer, TelemetryMessage, PAYLOAD_CAPACITY};

mod publisher;
pub use publisher::Publisher;

mod scheduler;
pub use scheduler::{CycleStats, PollScheduler, SchedulerState};
