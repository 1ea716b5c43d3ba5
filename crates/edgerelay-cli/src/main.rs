//! EdgeRelay service binary.
//!
//! Connects to the broker, subscribes to the device's command topic, and
//! drains inbound envelopes through the engine until shutdown.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};

use edgerelay_core::EngineConfig;
use edgerelay_engine::Engine;
use edgerelay_mqtt::MqttTransport;

mod config;
mod executors;

use config::AppConfig;
use executors::{BuiltinExecutors, ExecutorRegistry};

/// EdgeRelay - drive a single device over MQTT with ordered command
/// sequences.
#[derive(Parser, Debug)]
#[command(name = "edgerelay")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the JSON configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Broker host (overrides config).
    #[arg(long)]
    broker: Option<String>,

    /// Broker port (overrides config).
    #[arg(long)]
    port: Option<u16>,

    /// Device identity envelopes must be addressed to (overrides config).
    #[arg(long)]
    client_id: Option<String>,

    /// Topic to subscribe and publish on (overrides config).
    #[arg(long)]
    topic: Option<String>,

    /// Verbose output.
    #[arg(short, long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let json_logging = std::env::var("EDGERELAY_LOG_JSON")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(false);

    let default_directive = if verbose {
        "edgerelay=debug,info"
    } else {
        "edgerelay=info,warn"
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive));

    if json_logging {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let mut config = match &args.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    config.apply_env_overrides();
    if let Some(broker) = args.broker {
        config.mqtt.broker = broker;
    }
    if let Some(port) = args.port {
        config.mqtt.port = port;
    }
    if let Some(client_id) = args.client_id {
        config.client_id = Some(client_id);
    }
    if let Some(topic) = args.topic {
        config.topic = topic;
    }

    let client_id = config
        .client_id
        .clone()
        .unwrap_or_else(|| format!("edgerelay-{}", uuid::Uuid::new_v4()));
    if config.mqtt.client_id.is_none() {
        config.mqtt.client_id = Some(client_id.clone());
    }

    info!(
        client_id = %client_id,
        broker = %config.mqtt.full_broker_addr(),
        topic = %config.topic,
        "starting edgerelay"
    );

    let mut registry = ExecutorRegistry::new();
    registry.register(
        BuiltinExecutors::COMMANDS,
        Arc::new(BuiltinExecutors::new(client_id.clone())),
    );
    info!(commands = ?registry.commands(), "registered executors");

    let (transport, mut inbound) = MqttTransport::connect(&config.mqtt, &config.topic)
        .await
        .context("failed to start mqtt transport")?;
    let transport = Arc::new(transport);

    let engine = Engine::new(
        EngineConfig {
            client_id,
            topic: config.topic.clone(),
            janitor: config.janitor.clone(),
        },
        Arc::new(registry),
        transport.clone(),
    );
    let janitor = engine.start_janitor();

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    let mut transport_died = false;

    loop {
        tokio::select! {
            maybe = inbound.recv() => match maybe {
                Some(message) => {
                    if let Err(err) = engine.handle_message(&message.topic, &message.payload).await {
                        error!(error = %err, "publish failed, sequence left for the reaper");
                    }
                }
                None => {
                    error!("transport event loop stopped, shutting down");
                    transport_died = true;
                    break;
                }
            },
            _ = &mut shutdown => {
                info!("shutdown requested");
                break;
            }
        }
    }

    // In-flight dispatch has finished by the time select returns; stop the
    // timers, then release the connection.
    janitor.shutdown();
    if let Err(err) = transport.disconnect().await {
        warn!(error = %err, "disconnect failed");
    }
    transport.shutdown();

    let stats = engine.stats().await;
    info!(
        sequences_completed = stats.sequences_completed,
        commands_executed = stats.commands_executed,
        echoes_dropped = stats.echoes_dropped,
        envelopes_rejected = stats.envelopes_rejected,
        "edgerelay stopped"
    );

    if transport_died {
        anyhow::bail!("mqtt event loop stopped before shutdown was requested");
    }
    Ok(())
}
