use anyhow::{Context, Result};
use tracing::info;

use polygon_collector::api::PolygonClient;
use polygon_collector::driver::run_complete_collection;
use polygon_collector::utils::init_logging;
use polygon_collector::{Config, DataCollector, DatabaseManager};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let config = Config::from_env().context(
        "Failed to load configuration. Make sure POLYGON_API_KEY is set in the environment or a .env file",
    )?;

    init_logging(&config.log_file)
        .with_context(|| format!("Failed to open log file {}", config.log_file))?;

    let database = DatabaseManager::new(&config.database_path)
        .await
        .with_context(|| format!("Failed to initialize database at {}", config.database_path))?;

    let client = PolygonClient::new(&config).context("Failed to build Polygon client")?;
    let collector = DataCollector::new(client, database);

    run_complete_collection(&collector, &config).await;

    info!("Data collection completed!");
    Ok(())
}
