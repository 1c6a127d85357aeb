//! Demo predictor: random variation around the last close.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::warn;

use super::Forecast;

/// Price reported when there is no data at all
pub const EMPTY_DATA_PRICE: f64 = 10.50;

/// Largest daily move, either direction
pub const MAX_VARIATION: f64 = 0.02;

/// Stand-in for the trained models. Not a real forecast.
#[derive(Debug, Clone, Default)]
pub struct SimulatedModel {
    seed: Option<u64>,
}

impl SimulatedModel {
    /// Seeded from the wall clock on every call
    pub fn new() -> Self {
        warn!("using SIMULATED model for demonstration; predictions are not financial advice");
        Self { seed: None }
    }

    /// Reproducible results
    pub fn with_seed(seed: u64) -> Self {
        Self { seed: Some(seed) }
    }

    fn rng(&self) -> StdRng {
        let seed = self.seed.unwrap_or_else(|| chrono::Utc::now().timestamp().unsigned_abs() % 1000);
        StdRng::seed_from_u64(seed)
    }

    /// Last close moved by up to ±2 %, rounded to cents
    pub fn predict_price(&self, closes: &[f64]) -> f64 {
        let Some(last) = closes.last() else {
            return EMPTY_DATA_PRICE;
        };
        let variation: f64 = self.rng().gen_range(-MAX_VARIATION..=MAX_VARIATION);
        round_cents(last * (1.0 + variation))
    }

    /// Two independent ±2 % walks from the last close, blended like the trained ensemble
    pub fn forecast(&self, closes: &[f64], days: usize) -> Forecast {
        let start = closes.last().copied().unwrap_or(EMPTY_DATA_PRICE);
        let mut rng = self.rng();
        let walk = |rng: &mut StdRng| {
            let mut price = start;
            (0..days)
                .map(|_| {
                    price *= 1.0 + rng.gen_range(-MAX_VARIATION..=MAX_VARIATION);
                    round_cents(price)
                })
                .collect::<Vec<f64>>()
        };
        let rf = walk(&mut rng);
        let lstm = walk(&mut rng);
        Forecast::from_components(rf, lstm)
    }
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
