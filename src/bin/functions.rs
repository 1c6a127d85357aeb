//! Single-row prediction and feedback endpoints
//!
//! Run: MODEL_PATH=models cargo run --release --bin functions
//! Test: curl -X POST http://localhost:3000/api/predict -H "Content-Type: application/json" -d '{"Open":150,"High":155,"Low":148,"Close":152,"Volume":1000000,"SMA20":149,"SMA50":145,"Volatility":0.03}'

use std::sync::Arc;

use sol_predictor::server::{self, functions};
use sol_predictor::{init_tracing, AppConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing("sol_predictor=info,tower_http=info");
    let config = AppConfig::from_env()?;

    let state = Arc::new(functions::FunctionsState::from_config(&config));
    server::serve(functions::router(state), config.socket_addr(), "functions").await?;
    Ok(())
}
