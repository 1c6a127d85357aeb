//! Price prediction.
//!
//! Trained artifacts are evaluated from JSON exports ([`ModelBundle`]);
//! [`SimulatedModel`] provides a demo answer when they are not available.
//! [`ForecastEngine`] hides which of the two is active.

pub mod forecast;
pub mod forest;
pub mod scaler;
pub mod sequence;
pub mod simulated;

pub use forecast::{
    missing_features, predict_next_days, predict_single, Forecast, ForecastEngine, ModelBundle, PointModel,
    ENSEMBLE_WEIGHTS, SEQUENCE_WINDOW,
};
pub use forest::{ForestRegressor, RegressionTree, TreeNode};
pub use scaler::StandardScaler;
pub use sequence::WindowRegressor;
pub use simulated::SimulatedModel;

use crate::error::Result;

/// Point model over one scaled feature row
pub trait Regressor: Send + Sync {
    fn predict(&self, inputs: &[f64]) -> Result<f64>;

    fn name(&self) -> &str;
}

/// Model over a trailing window of scaled feature rows
pub trait SequenceRegressor: Send + Sync {
    /// Rows consumed per prediction
    fn window(&self) -> usize;

    fn predict_sequence(&self, rows: &[Vec<f64>]) -> Result<f64>;

    fn name(&self) -> &str;
}
