use crate::{QoS, Result, Timestamp, Topic, Transport, TransportError};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use time::OffsetDateTime;

/// A publish accepted by [`MockTransport`].
#[derive(Clone, Debug)]
pub struct PublishedMessage {
    pub topic: String,
    pub qos: QoS,
    pub payload: Vec<u8>,
    pub timestamp: Timestamp,
}

impl PublishedMessage {
    pub fn payload_str(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }
}

#[derive(Debug, Default)]
struct MockState {
    published: Vec<PublishedMessage>,
    publish_calls: usize,
    service_calls: usize,
    fail_calls: HashSet<usize>,
    fail_all: Option<TransportError>,
    fail_service: Option<TransportError>,
}

/// A simple in-process mock client. Each instance is independent.
#[derive(Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

/// Inspection and failure-injection handle for a [`MockTransport`].
#[derive(Clone)]
pub struct MockHandle {
    state: Arc<Mutex<MockState>>,
}

fn lock(state: &Mutex<MockState>) -> MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&self) -> MockHandle {
        MockHandle {
            state: Arc::clone(&self.state),
        }
    }
}

impl MockHandle {
    pub fn published(&self) -> Vec<PublishedMessage> {
        lock(&self.state).published.clone()
    }

    /// Every publish attempt, accepted or not.
    pub fn publish_calls(&self) -> usize {
        lock(&self.state).publish_calls
    }

    pub fn service_calls(&self) -> usize {
        lock(&self.state).service_calls
    }

    /// Reject the publish attempt with this 0-based sequence number.
    pub fn fail_publish_call(&self, n: usize) {
        lock(&self.state).fail_calls.insert(n);
    }

    pub fn fail_all_publishes(&self, err: Option<TransportError>) {
        lock(&self.state).fail_all = err;
    }

    pub fn fail_service(&self, err: Option<TransportError>) {
        lock(&self.state).fail_service = err;
    }
}

impl Transport for MockTransport {
    fn service(&mut self) -> Result<()> {
        let mut st = lock(&self.state);
        st.service_calls += 1;
        match &st.fail_service {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    fn publish(&mut self, topic: &Topic, payload: &[u8]) -> Result<()> {
        let mut st = lock(&self.state);
        let seq = st.publish_calls;
        st.publish_calls += 1;
        if let Some(e) = &st.fail_all {
            return Err(e.clone());
        }
        if st.fail_calls.contains(&seq) {
            return Err(TransportError::Rejected(format!("mock rejected publish #{seq}")));
        }
        st.published.push(PublishedMessage {
            topic: topic.name.clone(),
            qos: topic.qos,
            payload: payload.to_vec(),
            timestamp: Timestamp(OffsetDateTime::now_utc()),
        });
        Ok(())
    }
}
