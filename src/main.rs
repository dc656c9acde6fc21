use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use log::{error, info, warn};
use presence_rs::config::{AppConfig, awake_time_from_millis};
use presence_rs::{BroadcastListener, LogListener, PresenceService, TokioScheduler};
use tokio::io::BufReader;
use tokio::sync::mpsc;

mod feed;
mod manager;

/// Tracks whether queue-mode devices are awake, driven by activity read from stdin.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Default awake time in milliseconds, overriding the config file
    #[arg(long)]
    awake_time_ms: Option<i64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();
    let args = Args::parse();

    let config = if args.config.exists() {
        AppConfig::load(&args.config)?
    } else {
        warn!(
            "Config file {} not found, using defaults",
            args.config.display()
        );
        AppConfig::default()
    };

    let default_awake_time = match args.awake_time_ms {
        Some(millis) => awake_time_from_millis("--awake-time-ms", millis)?,
        None => config.default_awake_time()?,
    };

    info!("Devices: {:?}", config.devices());

    let service = Arc::new(PresenceService::new(
        Arc::new(TokioScheduler::current()),
        default_awake_time,
    )?);
    service.listeners().add(Arc::new(LogListener));
    let (broadcaster, events) = BroadcastListener::new(64);
    service.listeners().add(Arc::new(broadcaster));

    for device in config.devices() {
        service.register(&device.name, device.awake_time()?)?;
    }

    let (tx, rx) = mpsc::channel(64);
    tokio::spawn(async move {
        if let Err(err) = feed::read_commands(BufReader::new(tokio::io::stdin()), tx).await {
            error!("Error reading activity feed: {:?}", err);
        }
    });

    manager::Manager::new(service, events, rx).run_loop().await
}
