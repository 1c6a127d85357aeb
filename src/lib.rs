//! # SOL Predictor
//!
//! Solana price analysis driven by short Spanish commands.
//!
//! ## Pipeline
//! - [`nlp`] turns text into a metric, period and request kind
//! - indicator modules compute SMA, EMA, RSI, MACD, volatility and Bollinger bands
//! - [`model`] forecasts with a tree/sequence ensemble or a simulated model
//! - [`chart`] and [`analysis`] assemble the dashboard answer
//! - [`server`] exposes it over HTTP
//!
//! ```
//! use sol_predictor::{macd_default, parse_command, rsi, sma};
//!
//! let closes = [21.3, 21.9, 22.4, 22.1, 23.0, 23.6, 23.2, 24.1];
//! assert_eq!(sma(&closes, 4).len(), closes.len());
//! // fewer closes than the RSI period
//! assert!(rsi(&closes, 14).iter().all(|v| v.is_nan()));
//! assert_eq!(macd_default(&closes).histogram.len(), closes.len());
//!
//! let command = parse_command("RSI histórico en 2024");
//! assert!(command.confidence > 0.5);
//! ```

pub mod analysis;
pub mod chart;
pub mod common;
pub mod config;
pub mod data;
pub mod error;
pub mod model;
pub mod moving_averages;
pub mod momentum;
pub mod nlp;
pub mod oscillators;
pub mod server;
pub mod volatility;

// Re-export commonly used items at crate root
pub use analysis::{Analysis, Analyzer};
pub use config::{init_tracing, AppConfig, PredictorKind};
pub use data::{prepare_features, Candle, FeatureRow, PriceHistory};
pub use error::{Error, Result};
pub use model::{Forecast, ForecastEngine, ModelBundle, SimulatedModel};
pub use moving_averages::{ema, sma};
pub use momentum::{macd, macd_default, Macd};
pub use nlp::{extract_parameters, parse_command, ParsedCommand};
pub use oscillators::{rsi, rsi_rolling, RsiZone};
pub use volatility::{annualized_volatility, bollinger_bands, rolling_volatility, BollingerBands, RiskLevel};

#[cfg(feature = "wasm")]
use wasm_bindgen::prelude::*;

/// Indicator and parser exports for JavaScript callers
#[cfg(feature = "wasm")]
#[wasm_bindgen]
pub struct Indicators;

#[cfg(feature = "wasm")]
#[wasm_bindgen]
impl Indicators {
    #[wasm_bindgen]
    pub fn sma(values: &[f64], period: usize) -> Vec<f64> {
        moving_averages::sma(values, period)
    }

    #[wasm_bindgen]
    pub fn ema(values: &[f64], period: usize) -> Vec<f64> {
        moving_averages::ema(values, period)
    }

    #[wasm_bindgen]
    pub fn rsi(closes: &[f64], period: usize) -> Vec<f64> {
        oscillators::rsi(closes, period)
    }

    #[wasm_bindgen]
    pub fn macd_line(closes: &[f64], fast: usize, slow: usize, signal: usize) -> Vec<f64> {
        momentum::macd(closes, fast, slow, signal).macd
    }

    #[wasm_bindgen]
    pub fn macd_signal(closes: &[f64], fast: usize, slow: usize, signal: usize) -> Vec<f64> {
        momentum::macd(closes, fast, slow, signal).signal
    }

    #[wasm_bindgen]
    pub fn volatility(closes: &[f64], period: usize) -> f64 {
        volatility::annualized_volatility(closes, period)
    }

    /// Parsed command as a JSON string
    #[wasm_bindgen]
    pub fn parse_command(input: &str) -> String {
        serde_json::to_string(&nlp::parse_command(input)).unwrap_or_default()
    }
}
