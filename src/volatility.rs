//! Volatility indicators

use serde::Serialize;

use crate::common::{nan_vec, pct_change, population_std, rolling, sample_std};
use crate::moving_averages::sma;

/// Trading days used to annualize daily volatility
pub const TRADING_DAYS: f64 = 252.0;

/// Calendar days used by the rolling (24/7 market) variant
pub const CALENDAR_DAYS: f64 = 365.0;

/// Annualized historical volatility
///
/// Population standard deviation of the last `period` simple returns,
/// multiplied by sqrt(252). Uses every available return when fewer than
/// `period` exist; fewer than two closes gives NaN.
pub fn annualized_volatility(closes: &[f64], period: usize) -> f64 {
    if closes.len() < 2 || period == 0 {
        return f64::NAN;
    }
    let returns: Vec<f64> = closes.windows(2).map(|w| (w[1] - w[0]) / w[0]).collect();
    let start = returns.len().saturating_sub(period);
    population_std(&returns[start..]) * TRADING_DAYS.sqrt()
}

/// Rolling volatility series
///
/// Sample standard deviation of simple returns over `window`, scaled by
/// sqrt(`periods_per_year`). The first `window` positions are NaN.
pub fn rolling_volatility(closes: &[f64], window: usize, periods_per_year: f64) -> Vec<f64> {
    let returns = pct_change(closes);
    let factor = periods_per_year.sqrt();
    rolling(&returns, window, sample_std)
        .into_iter()
        .map(|s| s * factor)
        .collect()
}

/// Bollinger Bands lines
#[derive(Debug, Clone, Serialize)]
pub struct BollingerBands {
    pub upper: Vec<f64>,
    pub middle: Vec<f64>,
    pub lower: Vec<f64>,
}

/// Bollinger Bands
///
/// Middle = SMA(period); Upper/Lower = Middle ± std_mult × sample std.
pub fn bollinger_bands(closes: &[f64], period: usize, std_mult: f64) -> BollingerBands {
    let n = closes.len();
    let middle = sma(closes, period);
    let std = rolling(closes, period, sample_std);

    let mut upper = nan_vec(n);
    let mut lower = nan_vec(n);
    for i in 0..n {
        if !middle[i].is_nan() && !std[i].is_nan() {
            upper[i] = middle[i] + std[i] * std_mult;
            lower[i] = middle[i] - std[i] * std_mult;
        }
    }

    BollingerBands { upper, middle, lower }
}

/// Risk bucket for an annualized volatility ratio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    High,
    Medium,
    Low,
}

impl RiskLevel {
    pub fn classify(volatility: f64) -> Self {
        if volatility > 0.5 {
            RiskLevel::High
        } else if volatility > 0.3 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RiskLevel::High => "Alto",
            RiskLevel::Medium => "Medio",
            RiskLevel::Low => "Bajo",
        }
    }
}
