//! Oscillator Indicators
//!
//! - RSI: Relative Strength Index (Wilder smoothing, and a rolling-mean variant)
//! - RSI zone interpretation

use serde::Serialize;

use crate::common::{diff, gains_losses, nan_vec};
use crate::moving_averages::sma;

/// Wilder RSI over `period` price changes.
///
/// The first average gain/loss is a plain mean of the first `period` changes;
/// later ones are smoothed as `(prev * (period - 1) + current) / period`.
/// `RSI = 100 - 100 / (1 + avg_gain / avg_loss)`.
///
/// Positions before `period` are NaN. A window without losses reads 100, or 0
/// when prices did not move at all.
pub fn rsi(closes: &[f64], period: usize) -> Vec<f64> {
    let n = closes.len();
    if period == 0 || n < period + 1 {
        return nan_vec(n);
    }

    let mut result = nan_vec(n);

    let changes = diff(closes);
    let (gains, losses) = gains_losses(&changes);

    let mut avg_gain: f64 = gains[..period].iter().sum::<f64>() / period as f64;
    let mut avg_loss: f64 = losses[..period].iter().sum::<f64>() / period as f64;

    result[period] = rsi_value(avg_gain, avg_loss);

    for i in period..changes.len() {
        avg_gain = (avg_gain * (period - 1) as f64 + gains[i]) / period as f64;
        avg_loss = (avg_loss * (period - 1) as f64 + losses[i]) / period as f64;
        result[i + 1] = rsi_value(avg_gain, avg_loss);
    }

    result
}

#[inline]
fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        if avg_gain > 0.0 { 100.0 } else { 0.0 }
    } else {
        100.0 - (100.0 / (1.0 + avg_gain / avg_loss))
    }
}

/// RSI from rolling simple means of gains and losses (Cutler's RSI)
///
/// The first close has no change and counts as a zero gain and zero loss,
/// so the first defined value sits at index `period - 1`. A window without
/// gains or losses is undefined (NaN).
pub fn rsi_rolling(closes: &[f64], period: usize) -> Vec<f64> {
    let n = closes.len();
    if period == 0 || n < period {
        return nan_vec(n);
    }

    let mut changes = Vec::with_capacity(n);
    changes.push(0.0);
    changes.extend(diff(closes));
    let (gains, losses) = gains_losses(&changes);
    let avg_gains = sma(&gains, period);
    let avg_losses = sma(&losses, period);

    avg_gains
        .iter()
        .zip(&avg_losses)
        .map(|(&ag, &al)| {
            if ag.is_nan() || al.is_nan() {
                f64::NAN
            } else if al != 0.0 {
                100.0 - (100.0 / (1.0 + ag / al))
            } else if ag > 0.0 {
                100.0
            } else {
                f64::NAN
            }
        })
        .collect()
}

/// Reading of an RSI value against the classic 70 / 30 thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RsiZone {
    Overbought,
    Oversold,
    Neutral,
}

impl RsiZone {
    pub fn classify(value: f64) -> Self {
        if value > 70.0 {
            RsiZone::Overbought
        } else if value < 30.0 {
            RsiZone::Oversold
        } else {
            RsiZone::Neutral
        }
    }

    /// Spanish label shown next to the reading
    pub fn label(&self) -> &'static str {
        match self {
            RsiZone::Overbought => "SOBRECOMPRA",
            RsiZone::Oversold => "SOBREVENTA",
            RsiZone::Neutral => "Neutro",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_rsi_warmup() {
        let closes: Vec<f64> = (0..20).map(|i| 10.0 + (i % 3) as f64).collect();
        let r = rsi(&closes, 14);
        assert_eq!(r.len(), 20);
        assert!(r[..14].iter().all(|v| v.is_nan()));
        assert!(r[14..].iter().all(|v| (0.0..=100.0).contains(v)));
    }

    #[test]
    fn test_rsi_monotonic_up_is_100() {
        let closes: Vec<f64> = (0..30).map(|i| i as f64).collect();
        let r = rsi(&closes, 14);
        assert_eq!(r[29], 100.0);
    }

    #[test]
    fn test_rsi_flat_is_zero() {
        let r = rsi(&[5.0; 20], 14);
        assert_eq!(r[19], 0.0);
    }

    #[test]
    fn test_rsi_known_value() {
        // 2 gains of 1, 1 loss of 1 over period 3 => RS 2 => RSI 66.67
        let r = rsi(&[1.0, 2.0, 3.0, 2.0], 3);
        assert_relative_eq!(r[3], 100.0 - 100.0 / 3.0, epsilon = 1e-9);
    }

    #[test]
    fn test_rsi_short_input() {
        assert!(rsi(&[1.0, 2.0], 14).iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_rsi_rolling() {
        // gains (0, 1, 1, 0, 0), losses (0, 0, 0, 1, 0)
        let r = rsi_rolling(&[1.0, 2.0, 3.0, 2.0, 2.0], 3);
        assert!(r[1].is_nan());
        assert_eq!(r[2], 100.0);
        assert_relative_eq!(r[3], 100.0 - 100.0 / 3.0, epsilon = 1e-9);
        assert_relative_eq!(r[4], 50.0, epsilon = 1e-9);
        assert!(rsi_rolling(&[4.0; 6], 3)[5].is_nan());
        assert!(rsi_rolling(&[1.0, 2.0], 3).iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_rsi_rolling_first_value_at_period_minus_one() {
        // 20 closes alternating +1 / -0.5 after a flat start
        let mut closes = vec![10.0];
        for i in 1..20 {
            let step = if i % 2 == 1 { 1.0 } else { -0.5 };
            closes.push(closes[i - 1] + step);
        }
        let r = rsi_rolling(&closes, 14);
        assert!(r[12].is_nan());
        // window 0..=13: seven gains of 1, six losses of 0.5
        assert_relative_eq!(r[13], 100.0 - 100.0 / (1.0 + 7.0 / 3.0), epsilon = 1e-9);
        assert!(r[14..].iter().all(|v| !v.is_nan()));
    }

    #[test]
    fn test_zone() {
        assert_eq!(RsiZone::classify(75.0), RsiZone::Overbought);
        assert_eq!(RsiZone::classify(25.0), RsiZone::Oversold);
        assert_eq!(RsiZone::classify(70.0), RsiZone::Neutral);
        assert_eq!(RsiZone::Oversold.label(), "SOBREVENTA");
    }
}
