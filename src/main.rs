//! `beacon-positioning` CLI: replay recorded ranging ticks, manage config files.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use beacon_positioning::anchors::read_anchor_feed;
use beacon_positioning::api::{CallbackPositioningApi, OutputFormat, SessionEvent, UpdateFormatter};
use beacon_positioning::pipeline::PositioningSession;
use beacon_positioning::ranging::ReplaySource;
use beacon_positioning::utils::config::{validate, ConfigFileData};
use beacon_positioning::utils::ConfigurationManager;
use beacon_positioning::validation::ErrorKind;

#[derive(Parser)]
#[command(name = "beacon-positioning", about = "BLE beacon indoor positioning")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run recorded ranging ticks through a session and print every estimate.
    Replay {
        /// Configuration file; defaults and seed anchors when omitted
        #[arg(long)]
        config: Option<PathBuf>,
        /// JSON array of ticks, each an array of {beacon_id, rssi}
        #[arg(long)]
        ticks: PathBuf,
        /// Saved anchor metadata feed, merged on the first accepted tick
        #[arg(long)]
        feed: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
        /// Indent JSON output
        #[arg(long)]
        pretty: bool,
    },
    /// Write the default configuration to a file.
    DefaultConfig {
        #[arg(long)]
        output: PathBuf,
    },
    /// Check a configuration file and report problems.
    Validate {
        config: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Replay {
            config,
            ticks,
            feed,
            format,
            pretty,
        } => run_replay(config.as_deref(), &ticks, feed.as_deref(), format, pretty)?,
        Commands::DefaultConfig { output } => {
            ConfigurationManager::new()
                .save_to_file(&output)
                .with_context(|| format!("writing {}", output.display()))?;
            println!("Default configuration written to {}", output.display());
        }
        Commands::Validate { config } => validate_config(&config)?,
    }

    Ok(())
}

fn run_replay(
    config_path: Option<&Path>,
    ticks_path: &Path,
    feed_path: Option<&Path>,
    format: OutputFormat,
    pretty: bool,
) -> Result<()> {
    let mut manager = match config_path {
        Some(path) => ConfigurationManager::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ConfigurationManager::new(),
    };

    let feed = match feed_path {
        Some(path) => {
            let feed = read_anchor_feed(path)?;
            let mut positioning = manager.positioning().clone();
            positioning.await_anchor_feed = true;
            manager.update_positioning(positioning)?;
            Some(feed)
        }
        None => None,
    };

    let mut api = CallbackPositioningApi::new(PositioningSession::from_config(&manager));
    api.register_event_callback(Box::new(|event| match event {
        SessionEvent::TickRejected { error } => debug!(%error, "tick rejected"),
        SessionEvent::SolveSkipped { reason } => debug!(%reason, "solve skipped"),
        SessionEvent::RegistryLoaded { anchors } => info!(anchors, "anchor registry loaded"),
        SessionEvent::StateChanged { old_state, new_state } => {
            debug!(?old_state, ?new_state, "session state changed")
        }
    }));
    if let Some(feed) = feed {
        api.stage_anchor_feed(feed);
    }

    let mut source = ReplaySource::from_file(ticks_path)
        .with_context(|| format!("loading ticks {}", ticks_path.display()))?;
    let updates = api.run_source(&mut source)?;

    let mut formatter = UpdateFormatter::new(format);
    if pretty {
        formatter = formatter.pretty();
    }
    for update in &updates {
        println!("{}", formatter.format(update)?);
    }

    let stats = api.session().stats();
    let insufficient = stats.failures_of(ErrorKind::InsufficientBeacons);
    if insufficient > 0 {
        warn!(ticks = insufficient, "ticks with fewer than three beacons in view");
    }
    info!(
        accepted = stats.accepted_ticks,
        rejected = stats.rejected_ticks,
        solves = stats.solves,
        skipped = stats.skipped_solves,
        "replay finished"
    );

    Ok(())
}

fn validate_config(path: &Path) -> Result<()> {
    let content = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let data: ConfigFileData = serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
    let result = validate(&data);

    for warning in &result.warnings {
        println!("warning: {}", warning);
    }
    for error in &result.errors {
        println!("error: {}", error);
    }
    if !result.is_valid {
        bail!("{} has {} error(s)", path.display(), result.errors.len());
    }
    println!("{} is valid", path.display());
    Ok(())
}
