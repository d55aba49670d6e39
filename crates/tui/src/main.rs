mod app;
mod sprite;
mod viewport;

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    sync::{Arc, Mutex},
};

use parklot_core::{
    config::{self, AppConfig},
    FsImageLoader, SessionController, SystemClock, VehicleCatalog,
};
use tracing::info;
use tracing_subscriber::{prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;

    let config_path = config::ensure_default_config()?;
    let config = AppConfig::load()
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;
    info!(path = %config_path.display(), slots = config.layout.slot_rects().len(), "Configuration loaded");

    let catalog = VehicleCatalog::load(&FsImageLoader, &config.assets);
    let controller = SessionController::new(&config, catalog, Arc::new(SystemClock));

    let mut app = app::ParkingApp::new(controller, config.ui.tick_rate());
    app.run().await
}

/// The terminal belongs to the UI, so logs only go to `logs/parklot.log`.
fn init_logging() -> Result<()> {
    let log_dir = std::env::current_dir()?.join("logs");
    fs::create_dir_all(&log_dir)?;
    let log_path = log_dir.join("parklot.log");
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("failed to open {}", log_path.display()))?;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(false)
        .compact()
        .with_writer(Mutex::new(log_file));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .init();

    Ok(())
}
