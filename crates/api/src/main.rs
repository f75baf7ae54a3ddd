//! Transit Classifier Service - Main Entry Point

use anyhow::Context;
use api::{init_logging, run_server, AppConfig};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("failed to load configuration")?;
    init_logging(&config.log)?;

    info!("=== Transit Classifier v{} ===", env!("CARGO_PKG_VERSION"));
    info!(
        model_dir = %config.model.dir.display(),
        model_kind = ?config.model.kind,
        transit_search = ?config.features.transit_search,
        "Configuration loaded"
    );

    run_server(config).await
}
