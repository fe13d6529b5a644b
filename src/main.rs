//! Sales Forecast: per-item forecast lookup dashboard
//!
//! Entry point. Loads configuration, initialises structured logging,
//! loads the forecast table once, and serves the dashboard until Ctrl+C.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use sales_forecast::config::AppConfig;
use sales_forecast::dashboard::{self, routes::DashboardState};
use sales_forecast::data::{Dataset, DatasetCache};
use sales_forecast::engine::lookup;

const BANNER: &str = r#"
  ____        _             _____                            _
 / ___|  __ _| | ___  ___  |  ___|__  _ __ ___  ___ __ _ ___| |_
 \___ \ / _` | |/ _ \/ __| | |_ / _ \| '__/ _ \/ __/ _` / __| __|
  ___) | (_| | |  __/\__ \ |  _| (_) | | |  __/ (_| (_| \__ \ |_
 |____/ \__,_|_|\___||___/ |_|  \___/|_|  \___|\___\__,_|___/\__|
"#;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    // Initialise logging first so config fallbacks are visible
    init_logging();

    let config_path = AppConfig::path_from_env();
    let cfg = AppConfig::load_or_default(&config_path)?;

    println!("{BANNER}");
    info!(
        title = %cfg.app.title,
        period = %cfg.app.forecast_period,
        predictions = %cfg.data.predictions_path,
        items = ?cfg.data.items_path,
        "Sales forecast dashboard starting up"
    );

    // -- Load data (required file failure is fatal) ----------------------

    let mut cache = DatasetCache::new();
    let dataset = Dataset::load(&mut cache, &cfg.data)
        .with_context(|| format!("Failed to load predictions from {}", cfg.data.predictions_path))?;

    let stats = lookup::table_stats(&dataset.predictions);
    info!(
        items = stats.total_items,
        shops = stats.total_shops,
        predictions = stats.total_predictions,
        item_metadata = dataset.items.is_some(),
        "Forecast table loaded"
    );

    // -- Serve ----------------------------------------------------------

    let state = Arc::new(DashboardState::new(cfg.app.clone(), cfg.data.clone(), dataset, cache));
    let addr = cfg.dashboard.bind_addr();
    dashboard::serve(state, &addr).await
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("sales_forecast=info"));

    let json_logging = std::env::var("FORECAST_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
