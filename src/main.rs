mod clock;
mod config;
mod coordinate;
mod poller;
mod sentence;
mod sink;
mod source;
mod stats;

use anyhow::{Context, Result};
use clock::SystemClock;
use config::Config;
use poller::{PollLoop, PollPolicy};
use sentence::TllBuilder;
use sink::{SerialSink, SinkSet, UdpSink};
use source::HttpPositionSource;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Code de sortie sur interruption forcée (128 + SIGINT)
const FORCED_EXIT_CODE: i32 = 130;

fn main() -> Result<()> {
    init_logging()?;

    info!("TLL bridge v{}", env!("CARGO_PKG_VERSION"));
    info!("Underwater GPS position to NMEA $RATLL (UDP / serial)");

    // Charger la configuration (refusée si aucune sortie n'est définie)
    let config_path = get_config_path();
    let config = load_or_create_config(&config_path)?;

    // Source de position
    let timeout = Duration::from_millis(config.source.timeout_ms);
    let source = HttpPositionSource::new(&config.source.base_url, timeout)
        .context("Failed to create HTTP client")?;

    info!("Configuration:");
    info!("  Position source: {}", source.url());
    info!("  Request timeout: {:?}", timeout);
    info!(
        "  Target: id={} name={} status={}",
        config.sentence.target_id, config.sentence.target_name, config.sentence.status
    );

    // Ouvrir les sorties une fois pour toute la durée du process
    let sinks = open_sinks(&config)?;

    let builder = TllBuilder::from(&config.sentence);
    let policy = PollPolicy::from(&config.poll);
    let mut poll_loop = PollLoop::new(source, SystemClock::new(), builder, sinks, policy);

    // Ctrl+C : arrêt coopératif, puis arrêt forcé à la deuxième pression
    let shutdown_requested = Arc::new(AtomicBool::new(false));
    let ctrl_c_count = Arc::new(AtomicU8::new(0));

    let shutdown_clone = Arc::clone(&shutdown_requested);
    let count_clone = Arc::clone(&ctrl_c_count);

    ctrlc::set_handler(move || {
        let count = count_clone.fetch_add(1, Ordering::SeqCst);

        if count == 0 {
            warn!("Ctrl+C detected, finishing current cycle. Press again to force exit.");
            shutdown_clone.store(true, Ordering::SeqCst);
        } else {
            error!("Forced exit");
            std::process::exit(FORCED_EXIT_CODE);
        }
    })
    .context("Failed to set Ctrl+C handler")?;

    info!("Press Ctrl+C to stop");
    poll_loop.run(&shutdown_requested);

    info!(
        "Stopped after {} sentences",
        poll_loop.stats().sentences
    );

    // Le drop de poll_loop ferme le socket UDP et le port série
    Ok(())
}

/// `RUST_LOG` si défini, sinon `info`
fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .context("Failed to create log filter")?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_thread_ids(false))
        .with(filter)
        .init();

    Ok(())
}

/// Ouvre les sorties configurées
fn open_sinks(config: &Config) -> Result<SinkSet> {
    let mut sinks = SinkSet::new();

    if let Some(ref udp) = config.output.udp {
        let sink = UdpSink::open(&udp.host, udp.port)
            .with_context(|| format!("Failed to open UDP output {}:{}", udp.host, udp.port))?;
        sinks.push(Box::new(sink));
    } else {
        info!("  UDP output: disabled");
    }

    if let Some(ref serial) = config.output.serial {
        // Un port absent au démarrage n'est pas fatal : réouverture à chaque envoi
        let sink = SerialSink::open(&serial.device, serial.baud_rate);
        if !sink.is_open() {
            warn!("  Serial output {} not available yet", serial.device);
        }
        sinks.push(Box::new(sink));
    } else {
        info!("  Serial output: disabled");
    }

    info!("{} output(s) configured", sinks.len());
    Ok(sinks)
}

/// Chemin par défaut si aucun n'est passé en argument
#[cfg(target_os = "linux")]
const DEFAULT_CONFIG_PATH: &str = "/etc/tll-bridge/config.toml";

#[cfg(not(target_os = "linux"))]
const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// `tll-bridge [config.toml]`
fn get_config_path() -> PathBuf {
    config_path_from(std::env::args().skip(1))
}

fn config_path_from<I: IntoIterator<Item = String>>(args: I) -> PathBuf {
    args.into_iter()
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Premier lancement : écrit un fichier d'exemple (sortie UDP locale) puis le charge
fn load_or_create_config(path: &Path) -> Result<Config> {
    if path.exists() {
        info!("Loading configuration from {}", path.display());
        return Config::from_file(path);
    }

    warn!("No configuration at {}, writing an example", path.display());

    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?,
        _ => {}
    }

    Config::create_example_config(path)
        .with_context(|| format!("Failed to write example config to {}", path.display()))?;
    info!("Example configuration written, edit the source URL and outputs as needed");

    Config::from_file(path)
}
