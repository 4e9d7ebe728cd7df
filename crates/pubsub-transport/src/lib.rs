//! pubsub-transport: publish/subscribe client abstractions
//!
//! The core only needs two things from a transport: a `service` call that keeps the
//! session alive and a fire-and-forget `publish`. Backends are feature-gated; the default
//! build enables an in-process `mock` that records what it was asked to send.

mod types;
pub use types::{QoS, Timestamp, Topic};

mod error;
pub use error::{Result, TransportError};

mod traits;
pub use traits::Transport;

#[cfg(feature = "mock")]
mod mock;

#[cfg(feature = "mock")]
pub use mock::{MockHandle, MockTransport, PublishedMessage};

#[cfg(feature = "mqtt")]
mod mqtt;

#[cfg(feature = "mqtt")]
pub use mqtt::{MqttSettings, MqttTransport};
