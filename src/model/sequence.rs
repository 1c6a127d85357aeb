//! Window regressor standing in for the recurrent sequence model.

use serde::{Deserialize, Serialize};

use super::SequenceRegressor;
use crate::error::{Error, Result};

/// Linear model over a trailing window of scaled feature rows:
/// `intercept + Σ weights[j]·mean(window[j]) + Σ recent_weights[j]·last[j]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowRegressor {
    pub window: usize,
    pub weights: Vec<f64>,
    #[serde(default)]
    pub recent_weights: Option<Vec<f64>>,
    pub intercept: f64,
}

impl WindowRegressor {
    pub fn new(window: usize, weights: Vec<f64>, intercept: f64) -> Result<Self> {
        let model = Self { window, weights, recent_weights: None, intercept };
        model.validate()?;
        Ok(model)
    }

    pub fn with_recent_weights(mut self, recent: Vec<f64>) -> Result<Self> {
        self.recent_weights = Some(recent);
        self.validate()?;
        Ok(self)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.window == 0 {
            return Err(Error::InvalidModel("sequence window must be positive".to_string()));
        }
        if self.weights.is_empty() {
            return Err(Error::InvalidModel("sequence model without weights".to_string()));
        }
        if let Some(recent) = &self.recent_weights {
            if recent.len() != self.weights.len() {
                return Err(Error::InvalidModel(format!(
                    "recent_weights has {} entries, weights has {}",
                    recent.len(),
                    self.weights.len()
                )));
            }
        }
        Ok(())
    }
}

impl SequenceRegressor for WindowRegressor {
    fn window(&self) -> usize {
        self.window
    }

    fn predict_sequence(&self, rows: &[Vec<f64>]) -> Result<f64> {
        if rows.len() < self.window {
            return Err(Error::InsufficientData { required: self.window, actual: rows.len() });
        }
        let n_features = self.weights.len();
        let recent = &rows[rows.len() - self.window..];
        if let Some(bad) = recent.iter().find(|r| r.len() != n_features) {
            return Err(Error::InvalidInput(format!(
                "sequence model expects {} features, got {}",
                n_features,
                bad.len()
            )));
        }

        let mut output = self.intercept;
        for (j, w) in self.weights.iter().enumerate() {
            let column_mean = recent.iter().map(|r| r[j]).sum::<f64>() / self.window as f64;
            output += w * column_mean;
        }
        if let (Some(weights), Some(last)) = (&self.recent_weights, recent.last()) {
            output += weights.iter().zip(last).map(|(w, x)| w * x).sum::<f64>();
        }
        Ok(output)
    }

    fn name(&self) -> &str {
        "LSTM"
    }
}
