//! MACD

use serde::Serialize;

use crate::moving_averages::ema;

/// MACD output lines, all aligned with the input
#[derive(Debug, Clone, Serialize)]
pub struct Macd {
    pub macd: Vec<f64>,
    pub signal: Vec<f64>,
    pub histogram: Vec<f64>,
}

/// Fast EMA minus slow EMA, its `signal` EMA and the gap between the two.
///
/// The EMAs are seeded with the first close, so no warm-up positions are NaN.
pub fn macd(closes: &[f64], fast: usize, slow: usize, signal: usize) -> Macd {
    let macd_line: Vec<f64> = ema(closes, fast).iter().zip(&ema(closes, slow)).map(|(f, s)| f - s).collect();
    let signal_line = ema(&macd_line, signal);
    let histogram = macd_line.iter().zip(&signal_line).map(|(m, s)| m - s).collect();

    Macd { macd: macd_line, signal: signal_line, histogram }
}

/// MACD with the standard 12 / 26 / 9 parameters
pub fn macd_default(closes: &[f64]) -> Macd {
    macd(closes, 12, 26, 9)
}
