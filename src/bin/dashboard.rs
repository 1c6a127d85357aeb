//! Dashboard backend: parses a command and returns cards, messages and Plotly figures
//!
//! Run: cargo run --release --bin dashboard
//! Test: curl -X POST http://localhost:3000/analyze -H "Content-Type: application/json" -d '{"query":"gráfico de precio próximos 14 días"}'

use std::sync::Arc;

use anyhow::Context;
use sol_predictor::server::{self, dashboard};
use sol_predictor::{init_tracing, Analyzer, AppConfig, ForecastEngine, PriceHistory};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing("sol_predictor=info,tower_http=info");
    let config = AppConfig::from_env()?;

    let history = PriceHistory::from_csv(&config.data_path)
        .with_context(|| format!("failed to load {}", config.data_path.display()))?;
    info!(rows = history.len(), path = %config.data_path.display(), "historical data loaded");

    let analyzer = Analyzer::new(history, ForecastEngine::from_config(&config), config.default_forecast_days);
    server::serve(dashboard::router(Arc::new(analyzer)), config.socket_addr(), "dashboard").await?;
    Ok(())
}
