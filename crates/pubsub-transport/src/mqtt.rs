use crate::{QoS, Result, Topic, Transport, TransportError};
use rumqttc::{Client, ClientError, Connection, Event, MqttOptions, Packet, RecvTimeoutError};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Connection parameters for [`MqttTransport`].
#[derive(Clone, Debug)]
pub struct MqttSettings {
    pub host: String,
    pub port: u16,
    /// Defaults to `power-telemetry-<uuid>` when absent.
    pub client_id: Option<String>,
    pub keep_alive: Duration,
    /// Upper bound on the time one `service` call spends draining a live session.
    pub service_budget: Duration,
    /// While no session is up, `service` keeps polling this long so a slow TCP/CONNACK
    /// handshake is not cut off by the shorter budget.
    pub connect_timeout: Duration,
    /// Capacity of the client's outgoing request queue.
    pub request_capacity: usize,
}

impl Default for MqttSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1883,
            client_id: None,
            keep_alive: Duration::from_secs(30),
            service_budget: Duration::from_millis(100),
            connect_timeout: Duration::from_secs(5),
            request_capacity: 16,
        }
    }
}

/// Blocking MQTT client over `rumqttc`.
///
/// Session establishment and reconnection are handled by the rumqttc event loop, which
/// only makes progress while `service` drains it.
pub struct MqttTransport {
    client: Client,
    connection: Connection,
    budget: Duration,
    connect_timeout: Duration,
    connected: bool,
}

fn to_rumqttc(qos: QoS) -> rumqttc::QoS {
    match qos {
        QoS::AtMostOnce => rumqttc::QoS::AtMostOnce,
        QoS::AtLeastOnce => rumqttc::QoS::AtLeastOnce,
        QoS::ExactlyOnce => rumqttc::QoS::ExactlyOnce,
    }
}

impl MqttTransport {
    pub fn new(settings: &MqttSettings) -> Self {
        let client_id = settings
            .client_id
            .clone()
            .unwrap_or_else(|| format!("power-telemetry-{}", Uuid::new_v4()));
        info!(host = %settings.host, port = settings.port, %client_id, "mqtt client created");
        let mut options = MqttOptions::new(client_id, settings.host.clone(), settings.port);
        options.set_keep_alive(settings.keep_alive);
        let (client, connection) = Client::new(options, settings.request_capacity.max(1));
        Self {
            client,
            connection,
            budget: settings.service_budget,
            connect_timeout: settings.connect_timeout,
            connected: false,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// How long one `service` call may poll. Dropping the poll future mid-connect
    /// restarts the handshake, so a pending connect gets the longer window.
    fn service_window(&self) -> Duration {
        if self.connected {
            self.budget
        } else {
            self.budget.max(self.connect_timeout)
        }
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::Incoming(Packet::ConnAck(ack)) => {
                info!(code = ?ack.code, "mqtt session established");
                self.connected = true;
            }
            Event::Incoming(Packet::PubAck(ack)) => debug!(pkid = ack.pkid, "puback"),
            Event::Incoming(Packet::Disconnect) => {
                warn!("broker sent disconnect");
                self.connected = false;
            }
            Event::Incoming(packet) => debug!(?packet, "mqtt incoming"),
            Event::Outgoing(out) => debug!(?out, "mqtt outgoing"),
        }
    }
}

fn valid_topic(name: &str) -> bool {
    !name.is_empty() && !name.contains(&['+', '#', '\0'][..])
}

impl Transport for MqttTransport {
    fn service(&mut self) -> Result<()> {
        let started = Instant::now();
        loop {
            let deadline = started + self.service_window();
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(());
            }
            match self.connection.recv_timeout(remaining) {
                Ok(Ok(event)) => self.handle_event(event),
                Ok(Err(e)) => {
                    // rumqttc reconnects on the next poll; report and let the next tick retry
                    self.connected = false;
                    return Err(TransportError::Connection(e.to_string()));
                }
                Err(RecvTimeoutError::Timeout) => return Ok(()),
                Err(RecvTimeoutError::Disconnected) => {
                    self.connected = false;
                    return Err(TransportError::Closed);
                }
            }
        }
    }

    fn publish(&mut self, topic: &Topic, payload: &[u8]) -> Result<()> {
        if !valid_topic(&topic.name) {
            return Err(TransportError::InvalidTopic(topic.name.clone()));
        }
        if !self.connected {
            return Err(TransportError::NotConnected);
        }
        self.client
            .try_publish(
                topic.name.clone(),
                to_rumqttc(topic.qos),
                false,
                payload.to_vec(),
            )
            .map_err(|e| match e {
                ClientError::TryRequest(_) => TransportError::QueueFull,
                ClientError::Request(_) => TransportError::Closed,
            })
    }
}
