use anyhow::{Context, Result};
use snowcast::{ForecastBuilder, Pipeline, Resort, ResponseStore, SnowcastConfig, logging};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let config = SnowcastConfig::load()?;
    logging::init(&config.logging);

    let resorts_path: PathBuf = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .context("Usage: snowcast <resorts.json>")?;
    let resorts: Vec<Resort> = serde_json::from_str(
        &std::fs::read_to_string(&resorts_path)
            .with_context(|| format!("Failed to read {}", resorts_path.display()))?,
    )
    .with_context(|| format!("Failed to parse {}", resorts_path.display()))?;

    let store = if config.cache.enabled {
        let path = config.cache_path();
        info!("Opening response store at {}", path.display());
        Some(Arc::new(ResponseStore::open(&path)?))
    } else {
        None
    };

    let builder = ForecastBuilder::from_config(&config, store)?;

    let cancel = builder.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Shutdown requested, finishing in-flight resorts");
            cancel.cancel();
        }
    });

    let pipeline = Pipeline::sentence();
    for forecast in builder.build_all(&resorts, &pipeline).await {
        match forecast.result {
            Ok(view) => println!("{}: {view}", forecast.resort_id),
            Err(e) => eprintln!("{}: {}", forecast.resort_id, e.user_message()),
        }
    }

    Ok(())
}
