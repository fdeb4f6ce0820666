mod ui;

use anyhow::Result;
use applemar_planner::config::Config;
use applemar_planner::logging::init_logging;
use applemar_planner::risk::{Analyst, GeminiClient, RiskDesk};
use applemar_planner::state::AppState;
use applemar_planner::store::{KeyValueStore, MemoryStore, SqliteStore};
use std::sync::Arc;
use tracing::{info, warn};

fn main() -> Result<()> {
    let config = Config::from_env();

    // Keep the guard alive for the whole session so buffered log lines flush
    // A read-only home must not stop the planner, only its log file
    let _log_guard = match init_logging(&config.log) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("warning: file logging disabled: {e:#}");
            None
        }
    };
    info!(version = applemar_planner::VERSION, "starting planner");

    let store: Box<dyn KeyValueStore> = match SqliteStore::open(&config.db_path) {
        Ok(store) => Box::new(store),
        Err(e) => {
            warn!(
                error = %e,
                path = %config.db_path.display(),
                "database unavailable, using in-memory store"
            );
            Box::new(MemoryStore::new())
        }
    };
    let state = AppState::load(store);

    let analyst: Option<Arc<dyn Analyst>> = match GeminiClient::from_config(&config.analysis) {
        Ok(client) => Some(Arc::new(client) as Arc<dyn Analyst>),
        Err(e) => {
            warn!(code = e.code(), error = %e, "risk analysis disabled");
            None
        }
    };

    // Analysis requests run here; the UI thread only polls for results
    let runtime = tokio::runtime::Runtime::new()?;
    let desk = RiskDesk::new(analyst, runtime.handle().clone());

    let mut app = ui::App::new(state, desk, config.export_dir.clone());
    ui::run_ui(&mut app)?;

    info!("planner closed");
    Ok(())
}
