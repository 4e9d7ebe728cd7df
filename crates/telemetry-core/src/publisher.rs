use crate::{PublishError, TelemetryMessage};
use pubsub_transport::{Topic, Transport, TransportError};

/// Hands encoded messages to the transport. Never retries.
pub struct Publisher<T: Transport> {
    transport: T,
}

impl<T: Transport> Publisher<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Drive the transport's keep-alive and inbound processing.
    pub fn service(&mut self) -> Result<(), TransportError> {
        self.transport.service()
    }

    /// Offer one message for delivery at the topic's QoS.
    ///
    /// An error means only that the transport did not accept it this attempt.
    pub fn publish(&mut self, topic: &Topic, message: &TelemetryMessage) -> Result<(), PublishError> {
        self.transport
            .publish(topic, message.as_bytes())
            .map_err(|source| PublishError {
                topic: topic.name.clone(),
                source,
            })
    }
}
