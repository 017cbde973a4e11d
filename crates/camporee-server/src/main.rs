//! Camporee bracket station.
//!
//! Wires the on-disk stores to the bracket service and serves the HTTP
//! API until `Ctrl-C`.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `camporee-config.yaml` (defaults if absent)
//! 2. Initialize structured logging (tracing)
//! 3. Open the bracket store and score queue under `storage.data_dir`
//! 4. Load the roster
//! 5. Serve the API on `server.host:server.port`

mod error;

use std::path::Path;
use std::sync::Arc;

use camporee_bracket::config::{CamporeeConfig, LoggingConfig};
use camporee_bracket::roster::Roster;
use camporee_bracket::service::{BracketService, DynBracketService};
use camporee_bracket::store::{BracketRepository, ScoreQueue};
use camporee_db::{FileBracketStore, FileScoreQueue, load_roster};
use camporee_observer::{AppState, ServerConfig, start_server};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::StationError;

const CONFIG_PATH: &str = "camporee-config.yaml";

/// Application entry point for the bracket station.
///
/// # Errors
///
/// Returns an error if configuration, storage or the server fails.
#[tokio::main]
async fn main() -> Result<(), StationError> {
    let config_path = Path::new(CONFIG_PATH);
    let config = CamporeeConfig::load_or_default(config_path)?;

    init_tracing(&config.logging);
    info!("camporee-server starting");
    if !config_path.exists() {
        info!(path = CONFIG_PATH, "Config file not found, using defaults");
    }
    info!(
        data_dir = %config.storage.data_dir.display(),
        roster = %config.storage.roster_path.display(),
        port = config.server.port,
        "Configuration loaded"
    );

    let store: Box<dyn BracketRepository + Send + Sync> =
        Box::new(FileBracketStore::open(&config.storage.data_dir)?);
    let queue: Box<dyn ScoreQueue + Send + Sync> = Box::new(FileScoreQueue::open(
        &config.storage.data_dir.join("queue.json"),
    )?);
    let roster = Roster::new(load_roster(&config.storage.roster_path)?);
    if roster.is_empty() {
        warn!("Roster is empty; no event can be started until it is filled in");
    } else {
        info!(entities = roster.len(), "Roster loaded");
    }

    let judge = config.judge_identity();
    if let Some(judge) = &judge {
        info!(judge = %judge.name, unit = %judge.unit, "Packets will carry judge identity");
    }

    let service: DynBracketService = BracketService::new(store, queue, roster).with_judge(judge);
    let state = Arc::new(AppState::new(service));

    let server = ServerConfig {
        host: config.server.host,
        port: config.server.port,
    };
    start_server(&server, state).await?;

    info!("camporee-server stopped");
    Ok(())
}

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}
