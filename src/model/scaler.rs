//! Feature standardization with statistics fitted offline.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// `(x - mean) / scale` per feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    pub fn new(mean: Vec<f64>, scale: Vec<f64>) -> Result<Self> {
        let scaler = Self { mean, scale };
        scaler.validate()?;
        Ok(scaler)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.mean.len() != self.scale.len() {
            return Err(Error::InvalidModel(format!(
                "scaler has {} means but {} scales",
                self.mean.len(),
                self.scale.len()
            )));
        }
        if self.scale.iter().any(|s| *s == 0.0 || !s.is_finite()) {
            return Err(Error::InvalidModel("scaler scale must be finite and non-zero".to_string()));
        }
        Ok(())
    }

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    pub fn transform(&self, row: &[f64]) -> Result<Vec<f64>> {
        if row.len() != self.n_features() {
            return Err(Error::InvalidInput(format!(
                "expected {} features, got {}",
                self.n_features(),
                row.len()
            )));
        }
        Ok(row
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(x, (m, s))| (x - m) / s)
            .collect())
    }

    /// Undo the scaling of a single feature column
    pub fn inverse_transform_column(&self, column: usize, values: &[f64]) -> Result<Vec<f64>> {
        let (m, s) = self
            .mean
            .get(column)
            .zip(self.scale.get(column))
            .ok_or_else(|| Error::InvalidInput(format!("no scaler column {}", column)))?;
        Ok(values.iter().map(|v| v * s + m).collect())
    }
}
