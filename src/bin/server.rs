//! Query API for the chat front end
//!
//! Run: cargo run --release --bin server
//! Test: curl -X POST http://localhost:3000/api/predict -H "Content-Type: application/json" -d '{"query":"predicción del precio con rsi en 2024"}'

use std::sync::Arc;

use sol_predictor::server::{self, query_api};
use sol_predictor::{init_tracing, AppConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing("sol_predictor=info,tower_http=info");
    let config = AppConfig::from_env()?;

    let state = Arc::new(query_api::QueryState::from_config(&config));
    server::serve(query_api::router(state), config.socket_addr(), "query api").await?;
    Ok(())
}
