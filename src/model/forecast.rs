//! Loading trained artifacts and producing multi-day forecasts.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info};

use super::{ForestRegressor, Regressor, SequenceRegressor, SimulatedModel, StandardScaler, WindowRegressor};
use crate::config::{AppConfig, PredictorKind};
use crate::data::{prepare_features, FeatureRow, PriceHistory, MODEL_FEATURES};
use crate::error::{Error, Result};

/// Tree model weight, sequence model weight
pub const ENSEMBLE_WEIGHTS: (f64, f64) = (0.4, 0.6);

/// Rows the sequence model looks back over
pub const SEQUENCE_WINDOW: usize = 20;

/// Rolling window for the volatility feature
const VOLATILITY_WINDOW: usize = 20;

const SCALER_FILE: &str = "scaler.json";
const FOREST_FILE: &str = "rf_model.json";
const SEQUENCE_FILE: &str = "lstm_model.json";

/// Per-day predictions of both models, their blend and a ±5 % band
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Forecast {
    pub rf: Vec<f64>,
    pub lstm: Vec<f64>,
    pub ensemble: Vec<f64>,
    pub confidence_lower: Vec<f64>,
    pub confidence_upper: Vec<f64>,
}

impl Forecast {
    pub fn from_components(rf: Vec<f64>, lstm: Vec<f64>) -> Self {
        let (w_rf, w_lstm) = ENSEMBLE_WEIGHTS;
        let ensemble: Vec<f64> = rf.iter().zip(&lstm).map(|(r, l)| r * w_rf + l * w_lstm).collect();
        let confidence_lower = ensemble.iter().map(|e| e * 0.95).collect();
        let confidence_upper = ensemble.iter().map(|e| e * 1.05).collect();
        Self { rf, lstm, ensemble, confidence_lower, confidence_upper }
    }

    pub fn len(&self) -> usize {
        self.ensemble.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ensemble.is_empty()
    }
}

/// Scaler plus the tree model; enough for single-row predictions
#[derive(Debug, Clone)]
pub struct PointModel {
    pub scaler: StandardScaler,
    pub forest: ForestRegressor,
}

impl PointModel {
    pub fn new(scaler: StandardScaler, forest: ForestRegressor) -> Result<Self> {
        check_feature_count("scaler", scaler.n_features())?;
        check_feature_count("tree model", forest.n_features)?;
        Ok(Self { scaler, forest })
    }

    /// Read `scaler.json` and `rf_model.json` from `dir`
    pub fn load(dir: &Path) -> Result<Self> {
        let [scaler_path, forest_path] = [SCALER_FILE, FOREST_FILE].map(|f| dir.join(f));
        if !scaler_path.is_file() || !forest_path.is_file() {
            return Err(Error::ModelsNotFound(dir.display().to_string()));
        }

        let scaler: StandardScaler = read_json(&scaler_path)?;
        scaler.validate()?;
        let forest: ForestRegressor = read_json(&forest_path)?;
        forest.validate()?;
        Self::new(scaler, forest)
    }

    /// Tree model prediction for one row given by feature name
    pub fn predict(&self, body: &Map<String, Value>) -> Result<f64> {
        predict_single(self, body)
    }
}

fn check_feature_count(part: &str, n: usize) -> Result<()> {
    if n != MODEL_FEATURES.len() {
        return Err(Error::InvalidModel(format!("{} covers {} features, models use {}", part, n, MODEL_FEATURES.len())));
    }
    Ok(())
}

/// Scaler plus the two trained models
pub struct ModelBundle {
    pub scaler: StandardScaler,
    pub primary: Box<dyn Regressor>,
    pub sequence: Box<dyn SequenceRegressor>,
}

impl std::fmt::Debug for ModelBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelBundle")
            .field("features", &self.scaler.n_features())
            .field("primary", &self.primary.name())
            .field("sequence", &self.sequence.name())
            .finish()
    }
}

impl ModelBundle {
    pub fn new(
        scaler: StandardScaler,
        primary: Box<dyn Regressor>,
        sequence: Box<dyn SequenceRegressor>,
    ) -> Result<Self> {
        check_feature_count("scaler", scaler.n_features())?;
        Ok(Self { scaler, primary, sequence })
    }

    /// Read `scaler.json`, `rf_model.json` and `lstm_model.json` from `dir`
    pub fn load(dir: &Path) -> Result<Self> {
        let sequence_path = dir.join(SEQUENCE_FILE);
        if !sequence_path.is_file() {
            return Err(Error::ModelsNotFound(dir.display().to_string()));
        }
        let PointModel { scaler, forest } = PointModel::load(dir)?;
        let sequence: WindowRegressor = read_json(&sequence_path)?;
        sequence.validate()?;

        info!(dir = %dir.display(), trees = forest.trees.len(), window = sequence.window, "models loaded");
        Self::new(scaler, Box::new(forest), Box::new(sequence))
    }

    fn scaled_rows(&self, features: &[FeatureRow]) -> Result<Vec<Vec<f64>>> {
        features.iter().map(|row| self.scaler.transform(&row.model_inputs())).collect()
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

/// Predict `days` ahead from engineered features.
///
/// Both models see the same inputs each day (last row for the tree model,
/// last [`SEQUENCE_WINDOW`] rows for the sequence model), so the forecast is flat.
pub fn predict_next_days(bundle: &ModelBundle, features: &[FeatureRow], days: usize) -> Result<Forecast> {
    let window = bundle.sequence.window().max(SEQUENCE_WINDOW);
    if features.len() < window {
        return Err(Error::InsufficientData { required: window, actual: features.len() });
    }

    let scaled = bundle.scaled_rows(features)?;
    let last = &scaled[scaled.len() - 1];
    let recent = &scaled[scaled.len() - window..];

    let mut rf = Vec::with_capacity(days);
    let mut lstm = Vec::with_capacity(days);
    for _ in 0..days {
        rf.push(bundle.primary.predict(last)?);
        lstm.push(bundle.sequence.predict_sequence(recent)?);
    }
    debug!(days, rows = features.len(), "forecast computed");
    Ok(Forecast::from_components(rf, lstm))
}

/// Required feature names absent from `body`
pub fn missing_features(body: &Map<String, Value>) -> Vec<&'static str> {
    MODEL_FEATURES.iter().copied().filter(|name| !body.contains_key(*name)).collect()
}

/// Tree model prediction for one row given by feature name
pub fn predict_single(model: &PointModel, body: &Map<String, Value>) -> Result<f64> {
    let missing = missing_features(body);
    if !missing.is_empty() {
        return Err(Error::InvalidInput(format!("missing features: {}", missing.join(", "))));
    }
    let row = MODEL_FEATURES
        .iter()
        .map(|name| {
            body[*name]
                .as_f64()
                .ok_or_else(|| Error::InvalidInput(format!("feature {} must be a number", name)))
        })
        .collect::<Result<Vec<f64>>>()?;
    let scaled = model.scaler.transform(&row)?;
    model.forest.predict(&scaled)
}

/// Whichever predictor the deployment runs with
#[derive(Debug)]
pub enum ForecastEngine {
    Trained(ModelBundle),
    Simulated(SimulatedModel),
}

impl ForecastEngine {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        match config.predictor {
            PredictorKind::Trained => ModelBundle::load(&config.model_path).map(Self::Trained),
            PredictorKind::Simulated => Ok(Self::Simulated(SimulatedModel::new())),
        }
    }

    pub fn model_type(&self) -> &'static str {
        match self {
            Self::Trained(_) => "ensemble",
            Self::Simulated(_) => "simulated",
        }
    }

    pub fn forecast(&self, history: &PriceHistory, days: usize) -> Result<Forecast> {
        match self {
            Self::Trained(bundle) => {
                let features = prepare_features(history, VOLATILITY_WINDOW);
                predict_next_days(bundle, &features, days)
            }
            Self::Simulated(model) => Ok(model.forecast(&history.closes(), days)),
        }
    }

    /// Next-day price
    pub fn predict_price(&self, history: &PriceHistory) -> Result<f64> {
        match self {
            Self::Trained(_) => {
                let forecast = self.forecast(history, 1)?;
                forecast
                    .ensemble
                    .first()
                    .copied()
                    .ok_or_else(|| Error::EmptyData("empty forecast".to_string()))
            }
            Self::Simulated(model) => Ok(model.predict_price(&history.closes())),
        }
    }
}
