use crate::{Result, Topic};

/// A minimal blocking publish/subscribe client.
pub trait Transport {
    /// Run the client's internal processing: keep-alive, acknowledgements and inbound
    /// traffic. Must return within a bounded time.
    fn service(&mut self) -> Result<()>;

    /// Hand one payload to the client for delivery with the topic's QoS.
    ///
    /// `Ok` means accepted for delivery, not delivered; an error means not accepted
    /// this attempt.
    fn publish(&mut self, topic: &Topic, payload: &[u8]) -> Result<()>;
}
