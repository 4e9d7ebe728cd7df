//! YAML board configuration: transport settings, topic, poll cadence and the device table.

use crate::ConfigError;
use anyhow::Context;
use pubsub_transport::{QoS, Topic};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_TOPIC: &str = "v1/sensors/ina3221/state";
const FALLBACK_TAG: &str = "channel";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardConfig {
    #[serde(default)]
    pub mqtt: MqttConfig,
    #[serde(default = "default_topic")]
    pub topic: Topic,
    #[serde(default)]
    pub poll: PollConfig,
    #[serde(default)]
    pub devices: Vec<DeviceConfig>,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            mqtt: MqttConfig::default(),
            topic: default_topic(),
            poll: PollConfig::default(),
            devices: Vec::new(),
        }
    }
}

fn default_topic() -> Topic {
    Topic::new(DEFAULT_TOPIC, QoS::AtLeastOnce)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MqttConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u64,
    #[serde(default = "default_service_budget_ms")]
    pub service_budget_ms: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_request_capacity")]
    pub request_capacity: usize,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            client_id: None,
            keep_alive_secs: default_keep_alive_secs(),
            service_budget_ms: default_service_budget_ms(),
            connect_timeout_secs: default_connect_timeout_secs(),
            request_capacity: default_request_capacity(),
        }
    }
}

impl MqttConfig {
    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }

    pub fn service_budget(&self) -> Duration {
        Duration::from_millis(self.service_budget_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

fn default_host() -> String {
    "localhost".to_string()
}
fn default_port() -> u16 {
    1883
}
fn default_keep_alive_secs() -> u64 {
    30
}
fn default_service_budget_ms() -> u64 {
    100
}
fn default_connect_timeout_secs() -> u64 {
    5
}
fn default_request_capacity() -> usize {
    16
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
        }
    }
}

impl PollConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

fn default_interval_ms() -> u64 {
    1000
}

/// One physical multi-channel sensor and the channels to poll on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub name: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub driver: DriverConfig,
    #[serde(default)]
    pub channels: Vec<ChannelConfig>,
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DriverConfig {
    #[default]
    Mock,
    Hwmon {
        path: PathBuf,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// 0-based index into the device's channel space.
    pub index: u8,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
}

impl ChannelConfig {
    /// Display tag: `tag`, then `description`, then `label`, then `"channel"`.
    pub fn resolve_tag(&self) -> &str {
        [&self.tag, &self.description, &self.label]
            .into_iter()
            .filter_map(|s| s.as_deref())
            .find(|s| !s.trim().is_empty())
            .unwrap_or(FALLBACK_TAG)
    }
}

impl BoardConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll.interval_ms == 0 {
            return Err(ConfigError::ZeroInterval);
        }
        if self.topic.name.trim().is_empty() {
            return Err(ConfigError::EmptyTopic);
        }
        let mut names = HashSet::new();
        for dev in &self.devices {
            if dev.name.trim().is_empty() {
                return Err(ConfigError::EmptyDeviceName);
            }
            if !names.insert(dev.name.as_str()) {
                return Err(ConfigError::DuplicateDevice(dev.name.clone()));
            }
            let mut seen = HashSet::new();
            for ch in &dev.channels {
                if !seen.insert(ch.index) {
                    return Err(ConfigError::DuplicateChannel {
                        device: dev.name.clone(),
                        index: ch.index,
                    });
                }
            }
        }
        Ok(())
    }

    /// Number of channels the registry will hold: enabled devices only.
    pub fn enabled_channel_count(&self) -> usize {
        self.devices
            .iter()
            .filter(|d| d.enabled)
            .map(|d| d.channels.len())
            .sum()
    }
}

pub fn parse_config(raw: &str) -> anyhow::Result<BoardConfig> {
    let cfg: BoardConfig = serde_yaml::from_str(raw).context("parsing board config yaml")?;
    cfg.validate().context("validating board config")?;
    Ok(cfg)
}

pub fn load_config_file(path: impl AsRef<Path>) -> anyhow::Result<BoardConfig> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading board config: {}", path.display()))?;
    parse_config(&raw).with_context(|| format!("loading board config: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
mqtt:
  host: 10.10.10.123
topic:
  name: v1/sensors/ina3221/state
devices:
  - name: ina1
    driver: { kind: hwmon, path: /sys/class/hwmon/hwmon2 }
    channels:
      - index: 0
        tag: battery
      - index: 2
        description: solar input
  - name: ina2
    enabled: false
    channels:
      - index: 1
"#;

    #[test]
    fn test_parse_sample_with_defaults() {
        let cfg = parse_config(SAMPLE).unwrap();
        assert_eq!(cfg.mqtt.host, "10.10.10.123");
        assert_eq!(cfg.mqtt.port, 1883);
        assert_eq!(cfg.mqtt.connect_timeout(), Duration::from_secs(5));
        assert_eq!(cfg.topic.qos, QoS::AtLeastOnce);
        assert_eq!(cfg.poll.interval(), Duration::from_secs(1));
        assert_eq!(cfg.devices.len(), 2);
        assert_eq!(
            cfg.devices[0].driver,
            DriverConfig::Hwmon {
                path: PathBuf::from("/sys/class/hwmon/hwmon2")
            }
        );
        assert_eq!(cfg.devices[1].driver, DriverConfig::Mock);
        assert!(!cfg.devices[1].enabled);
        assert_eq!(cfg.enabled_channel_count(), 2);
    }

    #[test]
    fn test_empty_document_is_valid() {
        let cfg = parse_config("{}").unwrap();
        assert!(cfg.devices.is_empty());
        assert_eq!(cfg.topic.name, DEFAULT_TOPIC);
    }

    #[test]
    fn test_tag_fallback_chain() {
        let mut ch = ChannelConfig {
            index: 0,
            tag: None,
            description: None,
            label: None,
        };
        assert_eq!(ch.resolve_tag(), "channel");
        ch.label = Some("lbl".into());
        assert_eq!(ch.resolve_tag(), "lbl");
        ch.description = Some("desc".into());
        assert_eq!(ch.resolve_tag(), "desc");
        ch.tag = Some("".into());
        assert_eq!(ch.resolve_tag(), "desc");
        ch.tag = Some("tag".into());
        assert_eq!(ch.resolve_tag(), "tag");
    }

    #[test]
    fn test_rejects_duplicate_channel() {
        let mut cfg = BoardConfig::default();
        cfg.devices.push(DeviceConfig {
            name: "ina1".into(),
            enabled: true,
            driver: DriverConfig::Mock,
            channels: vec![
                ChannelConfig {
                    index: 1,
                    tag: None,
                    description: None,
                    label: None,
                },
                ChannelConfig {
                    index: 1,
                    tag: None,
                    description: None,
                    label: None,
                },
            ],
        });
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::DuplicateChannel {
                device: "ina1".into(),
                index: 1
            })
        );
    }

    #[test]
    fn test_rejects_duplicate_device_and_zero_interval() {
        let yaml = "devices:\n  - name: a\n  - name: a\n";
        assert!(parse_config(yaml).is_err());
        let yaml = "poll:\n  interval_ms: 0\n";
        let cfg: BoardConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroInterval));
    }

    #[test]
    fn test_accepts_top_channel_index() {
        let yaml = "devices:\n  - name: a\n    channels:\n      - index: 254\n      - index: 255\n";
        let cfg: BoardConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.validate(), Ok(()));
    }
}
