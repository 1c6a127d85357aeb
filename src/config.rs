//! Environment based configuration and logging setup.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::{Error, Result};

/// Which forecast engine answers prediction requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredictorKind {
    /// Pre-trained artifacts loaded from `MODEL_PATH`
    Trained,
    /// Random walk around the last close, for demos without artifacts
    Simulated,
}

impl FromStr for PredictorKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "trained" => Ok(PredictorKind::Trained),
            "simulated" => Ok(PredictorKind::Simulated),
            other => Err(Error::Config(format!("unknown PREDICTOR '{}'", other))),
        }
    }
}

/// Application settings shared by all binaries
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Historical OHLCV CSV
    pub data_path: PathBuf,
    /// Directory holding the model artifacts
    pub model_path: PathBuf,
    pub host: IpAddr,
    pub port: u16,
    /// Forecast horizon when the query does not name one
    pub default_forecast_days: usize,
    /// Maximum rows returned as chart data
    pub max_chart_points: usize,
    /// Files larger than this are replaced by simulated data in the query API
    pub max_data_bytes: u64,
    pub predictor: PredictorKind,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("data/sol_1d_data_2025.csv"),
            model_path: PathBuf::from("models"),
            host: IpAddr::from([127, 0, 0, 1]),
            port: 3000,
            default_forecast_days: 14,
            max_chart_points: 1000,
            max_data_bytes: 1_000_000,
            predictor: PredictorKind::Trained,
        }
    }
}

impl AppConfig {
    /// Load settings from the environment (and `.env` when present)
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Ok(Self {
            data_path: lookup("DATA_PATH").map(PathBuf::from).unwrap_or(defaults.data_path),
            model_path: lookup("MODEL_PATH").map(PathBuf::from).unwrap_or(defaults.model_path),
            host: parse_var(&lookup, "HOST", defaults.host)?,
            port: parse_var(&lookup, "PORT", defaults.port)?,
            default_forecast_days: parse_var(&lookup, "DEFAULT_FORECAST_DAYS", defaults.default_forecast_days)?,
            max_chart_points: parse_var(&lookup, "MAX_CHART_POINTS", defaults.max_chart_points)?,
            max_data_bytes: parse_var(&lookup, "MAX_DATA_BYTES", defaults.max_data_bytes)?,
            predictor: parse_var(&lookup, "PREDICTOR", defaults.predictor)?,
        })
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("{} has an invalid value '{}'", key, raw))),
        _ => Ok(default),
    }
}

/// Install the global tracing subscriber writing to stderr. `RUST_LOG` wins over `default_filter`.
pub fn init_tracing(default_filter: &str) {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.to_string().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}
