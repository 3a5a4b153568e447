//! vacfleet daemon: supervise a fleet of vacuum robots and bridge them onto
//! the message bus.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use vacfleet_bus::{BusSettings, Endpoint, MqttBus};
use vacfleet_core::FleetConfig;
use vacfleet_devices::{
    FleetSupervisor, LocalConnector, LocalSettings, PollSettings, SessionSettings,
};

/// Supervise a fleet of networked vacuum robots.
#[derive(Parser, Debug)]
#[command(name = "vacfleet", version, about, long_about = None)]
struct Args {
    /// Fleet configuration file listing the robots to supervise.
    #[arg(short, long, default_value = "fleet.json")]
    config: PathBuf,

    /// Bus broker endpoint, e.g. mqtt://broker:1883.
    #[arg(long, env = "MQTT_HOST")]
    broker: Option<String>,

    /// Root segment for bus topics.
    #[arg(long, env = "TOPIC_ROOT", default_value = "vacfleet")]
    topic_root: String,

    /// CA certificate for the robots' TLS control endpoints.
    #[arg(long)]
    robot_ca: Option<PathBuf>,

    /// Give up on a robot connection after this many seconds.
    /// Without it, connection attempts wait indefinitely.
    #[arg(long)]
    connect_timeout: Option<u64>,

    /// Verbose output.
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let Some(broker) = args.broker else {
        eprintln!("No bus broker configured: set MQTT_HOST or pass --broker");
        std::process::exit(1);
    };
    let endpoint: Endpoint = broker
        .parse()
        .with_context(|| format!("parsing broker endpoint {broker:?}"))?;

    let fleet = FleetConfig::load(&args.config)
        .with_context(|| format!("loading fleet configuration {}", args.config.display()))?;
    let robots = fleet
        .provision()
        .context("resolving robot credentials from the environment")?;
    info!(robots = robots.len(), "fleet configuration loaded");

    let (bus, commands) = MqttBus::connect(BusSettings::new(endpoint, args.topic_root.clone()));

    let connector = Arc::new(LocalConnector::new(LocalSettings {
        ca_cert: args.robot_ca,
        ..LocalSettings::default()
    }));
    let session_settings = SessionSettings {
        connect_timeout: args.connect_timeout.map(Duration::from_secs),
    };

    let supervisor = FleetSupervisor::new(
        robots,
        connector,
        Arc::new(bus),
        args.topic_root,
        session_settings,
        PollSettings::default(),
    );
    let _handles = supervisor.spawn_all();

    tokio::select! {
        _ = supervisor.route_commands(commands) => {}
        _ = tokio::signal::ctrl_c() => {
            info!("shutting down");
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "vacfleet=debug" } else { "vacfleet=info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
}
