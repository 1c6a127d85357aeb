//! Error types

use thiserror::Error;

/// Errors raised while loading data, running models or answering a query.
#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read CSV: {0}")]
    Csv(#[from] polars::prelude::PolarsError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("No data available: {0}")]
    EmptyData(String),

    #[error("Insufficient data: need {required} rows, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error(
        "Modelos no encontrados en {0}. Ejecuta primero el entrenamiento para generar \
         scaler.json, rf_model.json y lstm_model.json"
    )]
    ModelsNotFound(String),

    #[error("Prediction engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("Invalid model artifact: {0}")]
    InvalidModel(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Whether the caller sent something unusable (as opposed to a server fault)
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::InvalidInput(_) | Error::InsufficientData { .. })
    }
}

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, Error>;
