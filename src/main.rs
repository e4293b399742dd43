//! Main entry point for the alliance rating tool
//!
//! Loads configuration, replays match histories grouped by scope and prints
//! the resulting leaderboards as JSON.

use alliance_rating::config::{validate_config, AppConfig};
use alliance_rating::replay::{MatchRecord, ReplayControl};
use alliance_rating::service::{AppState, LeaderboardEntry};
use alliance_rating::types::ScopeId;
use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::io::Read;
use std::path::PathBuf;
use tokio::signal;
use tracing::{error, info, warn};

/// Alliance Rating - team ratings from alliance match results
#[derive(Parser)]
#[command(
    name = "alliance-rating",
    version,
    about = "Rate individual teams from alliance match results",
    long_about = "Alliance Rating replays match histories in chronological order and rates \
                 every team with a credit-and-surprise model: alliance strength drives the \
                 expected result, and each member's share of the rating change follows its \
                 relative strength within the alliance."
)]
struct Args {
    /// Configuration file path
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Path to configuration file (TOML format)"
    )]
    config: Option<PathBuf>,

    /// Match history to replay
    #[arg(
        long,
        value_name = "FILE",
        help = "JSON array of {scope_id, match} entries (reads stdin when omitted)"
    )]
    history: Option<PathBuf>,

    /// Log level override
    #[arg(
        short,
        long,
        value_name = "LEVEL",
        help = "Override log level (trace, debug, info, warn, error)"
    )]
    log_level: Option<String>,

    /// Enable debug mode
    #[arg(short, long, help = "Enable debug mode with verbose logging")]
    debug: bool,

    /// Dry run mode (validate config and exit)
    #[arg(long, help = "Validate configuration and exit without replaying")]
    dry_run: bool,

    /// Dump metrics after the replay
    #[arg(long, help = "Print Prometheus metrics to stderr after replaying")]
    metrics: bool,
}

/// One history entry tagged with the scope it belongs to
#[derive(Debug, Deserialize)]
struct ScopedMatch {
    scope_id: ScopeId,
    #[serde(rename = "match")]
    record: MatchRecord,
}

/// Initialize structured logging with the configured level
fn init_logging(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

/// Display startup banner with the active rating constants
fn display_startup_banner(config: &AppConfig) {
    info!("📈 Alliance Rating");
    info!("   Service: {}", config.service.name);
    info!("   Log level: {}", config.service.log_level);
    info!(
        "   K: {}  W: {}  match noise: {}",
        config.rating.k, config.rating.w, config.rating.u_match
    );
    info!(
        "   Initial: {} ± {}  floor: {}",
        config.rating.initial_rating, config.rating.initial_uncertainty, config.rating.u_min
    );
    info!(
        "   Concurrent scopes: {}",
        config.replay.max_concurrent_scopes
    );
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
}

/// Load and merge configuration from environment and CLI arguments
fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = if let Some(config_path) = &args.config {
        AppConfig::from_file(config_path)?
    } else {
        AppConfig::from_env()?
    };

    // Apply CLI overrides
    if let Some(log_level) = &args.log_level {
        config.service.log_level = log_level.clone();
    }

    if args.debug {
        config.service.log_level = "debug".to_string();
    }

    validate_config(&config)?;
    Ok(config)
}

/// Read the history and group it by scope, keeping input order per scope
fn load_history(path: Option<&PathBuf>) -> Result<HashMap<ScopeId, Vec<MatchRecord>>> {
    let raw = match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read history file {}", path.display()))?,
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read history from stdin")?;
            buffer
        }
    };

    let entries: Vec<ScopedMatch> =
        serde_json::from_str(&raw).context("Failed to parse match history")?;

    let mut scopes: HashMap<ScopeId, Vec<MatchRecord>> = HashMap::new();
    for entry in entries {
        scopes.entry(entry.scope_id).or_default().push(entry.record);
    }
    Ok(scopes)
}

/// Stop replays at the next match boundary on Ctrl+C
fn stop_on_ctrl_c(control: ReplayControl) {
    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                warn!("Received SIGINT (Ctrl+C), stopping after the current match");
                control.stop();
            }
            Err(e) => warn!("Failed to install Ctrl+C handler: {}", e),
        }
    });
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_config(&args).unwrap_or_else(|e| {
        eprintln!("Configuration error: {}", e);
        std::process::exit(1);
    });

    if let Err(e) = init_logging(&config.service.log_level) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    display_startup_banner(&config);

    if args.dry_run {
        info!("Configuration validation successful");
        info!("Dry run completed - exiting without replaying");
        return Ok(());
    }

    let histories = load_history(args.history.as_ref())?;
    info!(
        "Loaded {} matches across {} scopes",
        histories.values().map(Vec::len).sum::<usize>(),
        histories.len()
    );

    let app_state = AppState::new(config)?;
    let control = ReplayControl::new();
    stop_on_ctrl_c(control.clone());

    let summaries = app_state
        .service()
        .rebuild_scopes(histories, control)
        .await?;

    let mut leaderboards: BTreeMap<ScopeId, Vec<LeaderboardEntry>> = BTreeMap::new();
    for summary in &summaries {
        if let Err(e) = summary.ensure_complete() {
            error!("{}", e);
        }
        for skipped in &summary.skipped {
            warn!(
                "Skipped match {} in scope {}: {}",
                skipped.match_id, summary.scope_id, skipped.reason
            );
        }
    }
    for scope_id in app_state.service().scopes()? {
        let board = app_state.service().leaderboard(&scope_id)?;
        leaderboards.insert(scope_id, board);
    }

    println!("{}", serde_json::to_string_pretty(&leaderboards)?);

    if args.metrics {
        eprintln!("{}", app_state.metrics().gather_text()?);
    }

    if summaries.iter().any(|s| s.interrupted) {
        std::process::exit(130);
    }

    info!("✅ Replayed {} scopes", summaries.len());
    Ok(())
}
