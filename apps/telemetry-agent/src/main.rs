//! power-telemetry: poll INA3221 power monitors and publish their readings over MQTT.

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use pubsub_transport::{MockTransport, MqttSettings, MqttTransport, Transport};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

use telemetry_core as telem;
use telemetry_core::{BoardConfig, ChannelRegistry, PollScheduler};

#[derive(Parser, Debug)]
#[command(
    name = "power-telemetry",
    version,
    about = "Power monitor telemetry agent",
    disable_help_subcommand = true
)]
struct Cli {
    /// Default log filter when RUST_LOG is unset
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Poll every configured channel and publish readings
    Run {
        /// Board configuration YAML
        #[arg(long, default_value = "configs/board.yaml")]
        config: PathBuf,
        /// Stop after this many cycles (default: run forever)
        #[arg(long)]
        cycles: Option<u64>,
        /// Record publishes in-process instead of connecting to the broker
        #[arg(long, action = ArgAction::SetTrue)]
        mock_transport: bool,
    },
    /// Parse and validate a board configuration
    Validate {
        #[arg(long, default_value = "configs/board.yaml")]
        config: PathBuf,
        /// Print the parsed configuration as JSON
        #[arg(long, action = ArgAction::SetTrue)]
        json: bool,
    },
    /// List the channels the registry would poll
    Channels {
        #[arg(long, default_value = "configs/board.yaml")]
        config: PathBuf,
        /// Print as JSON
        #[arg(long, action = ArgAction::SetTrue)]
        json: bool,
    },
}

fn setup_tracing(default_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    // Best-effort; avoid panics if already set
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_tracing(&cli.log_level);

    match cli.command {
        Commands::Run {
            config,
            cycles,
            mock_transport,
        } => run(&config, cycles, mock_transport),
        Commands::Validate { config, json } => validate(&config, json),
        Commands::Channels { config, json } => channels(&config, json),
    }
}

fn mqtt_settings(cfg: &BoardConfig) -> MqttSettings {
    MqttSettings {
        host: cfg.mqtt.host.clone(),
        port: cfg.mqtt.port,
        client_id: cfg.mqtt.client_id.clone(),
        keep_alive: cfg.mqtt.keep_alive(),
        service_budget: cfg.mqtt.service_budget(),
        connect_timeout: cfg.mqtt.connect_timeout(),
        request_capacity: cfg.mqtt.request_capacity,
    }
}

fn run(path: &Path, cycles: Option<u64>, mock_transport: bool) -> Result<()> {
    let cfg = telem::load_config_file(path)?;
    let registry = ChannelRegistry::from_config(&cfg, telem::open_device)?;
    info!(
        topic = %cfg.topic,
        interval_ms = cfg.poll.interval_ms,
        "starting telemetry agent"
    );
    if mock_transport {
        let transport = MockTransport::new();
        let handle = transport.handle();
        poll(&cfg, registry, transport, cycles);
        info!(published = handle.published().len(), "mock transport summary");
    } else {
        let transport = MqttTransport::new(&mqtt_settings(&cfg));
        poll(&cfg, registry, transport, cycles);
    }
    Ok(())
}

fn poll<T: Transport>(cfg: &BoardConfig, registry: ChannelRegistry, transport: T, cycles: Option<u64>) {
    let mut scheduler =
        PollScheduler::new(registry, transport, cfg.topic.clone(), cfg.poll.interval());
    match cycles {
        Some(n) => {
            let stats = scheduler.run_cycles(n);
            info!(cycles = n, ?stats, "polling finished");
        }
        None => scheduler.run(),
    }
}

#[derive(Serialize)]
struct ChannelSummary<'a> {
    device: &'a str,
    channel: u16,
    tag: &'a str,
}

fn validate(path: &Path, json: bool) -> Result<()> {
    let cfg = telem::load_config_file(path)?;
    println!(
        "ok: {} devices, {} channels, topic {}",
        cfg.devices.len(),
        cfg.enabled_channel_count(),
        cfg.topic
    );
    if json {
        println!("{}", serde_json::to_string_pretty(&cfg)?);
    }
    Ok(())
}

fn channels(path: &Path, json: bool) -> Result<()> {
    let cfg = telem::load_config_file(path)?;
    let registry = ChannelRegistry::from_config(&cfg, telem::open_device)?;
    let rows: Vec<ChannelSummary<'_>> = registry
        .iter()
        .map(|d| ChannelSummary {
            device: d.device().name(),
            channel: d.channel_number(),
            tag: d.tag(),
        })
        .collect();
    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }
    for r in &rows {
        println!("{}\tch={}\ttag={}", r.device, r.channel, r.tag);
    }
    if rows.is_empty() {
        println!("no channels configured");
    }
    Ok(())
}
