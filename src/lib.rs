pub mod convert;
pub mod core;
pub mod normalize;
pub mod providers;
pub mod server;
pub mod setup;
pub mod store;

use crate::core::config::AppConfig;
use anyhow::Result;
use tracing::{debug, info};

pub use crate::core::{ProjectPatch, ProjectRecord, RateError, RateSource};
pub use convert::{ConversionError, ConvertedProject, CurrencyConverter, TtdAllowlist};
pub use normalize::normalize;
pub use store::{ProjectStore, StoreError};

/// Loads configuration and serves the HTTP API until shutdown.
pub async fn run(config_path: Option<&str>) -> Result<()> {
    info!("Budget service starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!(
        port = config.server.port,
        storage = ?config.storage,
        ttd_projects = config.ttd_projects.len(),
        "Loaded config"
    );

    let state = server::AppState::from_config(&config)?;
    server::serve(&config.server, state).await
}
