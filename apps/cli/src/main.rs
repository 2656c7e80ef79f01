mod config;
mod feed;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::AppConfig;
use sensemusic_audio::WavPlayer;
use sensemusic_bus::LocalBus;
use sensemusic_context::ContextService;
use sensemusic_events::{DeviceRole, Event, SubscriptionQuery};
use sensemusic_player::{PlayerAgent, PlayerConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Play music on the device you are most likely near.
#[derive(Parser, Debug)]
#[command(name = "sensemusic")]
#[command(version)]
#[command(about = "Play music on the device you are most likely near.", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the context service and a player, reading JSON events from stdin
    Run {
        /// Config file (default: ./sensemusic.toml if present)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Device this player runs on (laptop, pc, phone)
        #[arg(short, long)]
        role: Option<DeviceRole>,

        /// Only infer and publish context, never play
        #[arg(long)]
        no_player: bool,
    },

    /// Parse a subscription query and optionally test it against an event
    Query {
        /// Query text, e.g. "name:SenseMusicContext AND (home OR PC)"
        query: String,

        /// Event as JSON, e.g. '{"name": "SenseMusicContext", "value": "..."}'
        #[arg(short, long)]
        event: Option<String>,
    },

    /// List audio output devices
    Devices,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,sensemusic=debug")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            config,
            role,
            no_player,
        } => run(config, role, no_player).await,
        Commands::Query { query, event } => run_query(&query, event.as_deref()),
        Commands::Devices => list_devices(),
    }
}

async fn run(config_path: Option<PathBuf>, role: Option<DeviceRole>, no_player: bool) -> Result<()> {
    let mut config = AppConfig::load(config_path.as_deref())?;
    if let Some(role) = role {
        config.player.role = role;
    }

    let bus = Arc::new(LocalBus::with_config(config.bus.clone()));
    ContextService::new(config.context.clone(), bus.clone())
        .context("Failed to start context service")?
        .attach();

    if no_player {
        tracing::info!("Player disabled");
    } else {
        start_player(&config.player, &bus)?;
    }

    feed::spawn_stdin_feed(bus.clone()).context("Failed to start event feed")?;
    tracing::info!("SenseMusic running, press Ctrl-C to stop");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;

    tracing::info!(dropped = bus.dropped_events(), "Shutting down");
    // Workers hold the bus too, so it is never dropped on its own.
    bus.shutdown();
    Ok(())
}

fn start_player(config: &PlayerConfig, bus: &LocalBus) -> Result<()> {
    let device = match &config.output_device {
        Some(name) => sensemusic_audio::find_output_device(name)
            .context("Failed to list output devices")?
            .with_context(|| format!("No output device named '{}'", name))?,
        None => sensemusic_audio::default_output_device()
            .context("Failed to query the default output device")?
            .context("No default output device")?,
    };

    let pool = config.track_pool();
    let missing = pool.missing();
    if !missing.is_empty() {
        tracing::warn!(
            dir = %pool.dir().display(),
            missing = missing.len(),
            total = pool.len(),
            "Some tracks are missing"
        );
    }

    let output = Arc::new(WavPlayer::new(config.output_device.clone())?);
    let agent = PlayerAgent::new(config.role, pool, output).context("Failed to create player")?;
    tracing::info!(role = %config.role, device = %device.name, "Player ready");
    agent.attach(bus);
    Ok(())
}

fn run_query(text: &str, event: Option<&str>) -> Result<()> {
    let query =
        SubscriptionQuery::parse(text).with_context(|| format!("Invalid query '{}'", text))?;
    println!("{}", query);

    if let Some(json) = event {
        let event = Event::from_json(json).context("Invalid event JSON")?;
        let verdict = if query.matches(&event) { "match" } else { "no match" };
        println!("{}", verdict);
    }
    Ok(())
}

fn list_devices() -> Result<()> {
    let devices = sensemusic_audio::list_output_devices().context("Failed to list output devices")?;
    if devices.is_empty() {
        println!("No output devices found");
    }
    for device in devices {
        let marker = if device.is_default { "*" } else { " " };
        println!("{} {}", marker, device.name);
    }
    Ok(())
}
