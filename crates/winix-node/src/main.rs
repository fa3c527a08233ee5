//! Winix Node - host daemon for a Winix C545 air purifier
//!
//! This binary takes the place of the purifier's WiFi module:
//! - Opens the MCU UART and runs the protocol engine on a fixed tick
//! - Logs every entity update (fan, sensors, switches)
//! - Reads control commands from stdin, one per line

mod commands;

use anyhow::Context;
use clap::Parser;
use std::future::Future;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use commands::{parse_command, Command, USAGE};
use winix_c545::{
    AttributeUpdate, EntityRegistry, SerialTransport, Transport, WinixConfig,
    WinixConfigBuilder, WinixEngine,
};

#[derive(Parser)]
#[command(name = "winix-node")]
#[command(about = "Drive a Winix C545 air purifier over its MCU UART")]
struct Args {
    /// Serial port connected to the MCU (overrides the config file)
    #[arg(long, short)]
    port: Option<PathBuf>,

    /// Baud rate (overrides the config file)
    #[arg(long, short)]
    baud: Option<u32>,

    /// JSON configuration file
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Engine tick interval in milliseconds (overrides the config file)
    #[arg(long)]
    tick_ms: Option<u64>,

    /// Enable verbose logging
    #[arg(long, short)]
    verbose: bool,
}

fn load_config(args: &Args) -> anyhow::Result<WinixConfig> {
    let config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?
        }
        None => WinixConfig::default(),
    };

    let mut builder = WinixConfigBuilder::from_config(config);
    if let Some(port) = &args.port {
        builder = builder.serial_port(port.clone());
    }
    if let Some(baud) = args.baud {
        builder = builder.baud_rate(baud);
    }
    if let Some(ms) = args.tick_ms {
        builder = builder.tick_interval(Duration::from_millis(ms));
    }

    let config = builder.build();
    config.validate()?;
    Ok(config)
}

/// Sink that logs updates for one entity
fn log_sink(entity: &'static str) -> impl FnMut(&AttributeUpdate) + Send + 'static {
    move |update: &AttributeUpdate| info!(entity, %update, "Entity updated")
}

fn entity_registry() -> EntityRegistry {
    let mut entities = EntityRegistry::new();
    entities.set_fan(log_sink("fan"));
    entities.set_aqi_sensor(log_sink("aqi"));
    entities.set_aqi_indicator_sensor(log_sink("aqi_indicator"));
    entities.set_light_sensor(log_sink("light"));
    entities.set_filter_age_sensor(log_sink("filter_age"));
    entities.set_plasmawave_switch(log_sink("plasmawave"));
    entities.set_auto_switch(log_sink("auto"));
    entities.set_sleep_switch(log_sink("sleep"));
    entities
}

fn log_status<T: Transport>(engine: &WinixEngine<T>) {
    let attrs = engine.attributes();
    let stats = engine.stats();

    info!("═══════════════════════════════════════════════════════════");
    info!(
        "  Handshake: {} (connected: {})",
        engine.handshake_state(),
        engine.is_connected()
    );
    info!("  Power: {:?}  Speed: {:?}  Sleep: {:?}", attrs.power, attrs.speed, attrs.sleep);
    info!("  Plasmawave: {:?}  Auto: {:?}", attrs.plasmawave, attrs.auto_mode);
    info!("  AQI: {:?} ({:?})  Light: {:?}", attrs.aqi, attrs.aqi_indicator, attrs.light);
    info!("  Filter age: {:?}", attrs.filter_age);
    info!(
        "  Sentences: {} in, {} out, {} rejected",
        stats.sentences_received, stats.sentences_sent, stats.sentences_rejected
    );
    info!("═══════════════════════════════════════════════════════════");
}

/// Tick the engine and execute console commands until `shutdown` resolves
async fn run<T, F>(
    engine: &mut WinixEngine<T>,
    commands: &mut mpsc::Receiver<Command>,
    tick_interval: Duration,
    shutdown: F,
) where
    T: Transport,
    F: Future,
{
    let mut ticker = tokio::time::interval(tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    // Polled across iterations so a signal during a tick is not lost
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => engine.tick(Instant::now()),
            Some(command) = commands.recv() => match command {
                Command::Control(request) => {
                    if let Err(e) = engine.on_control_request(request) {
                        warn!(error = %e, "Control request failed");
                    }
                }
                Command::Status => log_status(engine),
                Command::Help => info!("{}", USAGE),
            },
            _ = &mut shutdown => {
                info!("Shutting down");
                break;
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = load_config(&args)?;
    info!("Starting Winix Node on {}", config.serial.port.display());

    let mut transport = SerialTransport::from_config(&config.serial);
    transport.open()?;

    let mut engine = WinixEngine::with_config(
        transport,
        entity_registry(),
        &config.protocol,
        Instant::now(),
    );
    engine.log_config();

    // Console commands
    let (command_tx, mut command_rx) = mpsc::channel::<Command>(16);
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) if line.trim().is_empty() => {}
                Ok(Some(line)) => match parse_command(&line) {
                    Ok(command) => {
                        if command_tx.send(command).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!("{}; {}", e, USAGE),
                },
                Ok(None) => break,
                Err(e) => {
                    error!("Failed to read stdin: {}", e);
                    break;
                }
            }
        }
    });

    info!("═══════════════════════════════════════════════════════════");
    info!("  Engine running, tick every {:?}", config.protocol.tick_interval);
    info!("  {}", USAGE);
    info!("═══════════════════════════════════════════════════════════");

    run(
        &mut engine,
        &mut command_rx,
        config.protocol.tick_interval,
        tokio::signal::ctrl_c(),
    )
    .await;

    engine.transport_mut().close();
    Ok(())
}
