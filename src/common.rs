//! Series helpers shared by the indicator modules.
//!
//! Series are `Vec<f64>` aligned with their input; undefined positions hold NaN.

/// A series of `len` undefined values
pub fn nan_vec(len: usize) -> Vec<f64> {
    vec![f64::NAN; len]
}

/// Arithmetic mean, NaN for an empty slice
pub fn mean(values: &[f64]) -> f64 {
    match values.len() {
        0 => f64::NAN,
        n => values.iter().sum::<f64>() / n as f64,
    }
}

/// Largest defined value (`-inf` when there is none)
pub fn max(values: &[f64]) -> f64 {
    values.iter().copied().filter(|v| !v.is_nan()).fold(f64::NEG_INFINITY, f64::max)
}

/// Smallest defined value (`inf` when there is none)
pub fn min(values: &[f64]) -> f64 {
    values.iter().copied().filter(|v| !v.is_nan()).fold(f64::INFINITY, f64::min)
}

fn squared_deviations(values: &[f64]) -> f64 {
    let m = mean(values);
    values.iter().map(|x| (x - m) * (x - m)).sum()
}

/// Standard deviation with `ddof = 0`
pub fn population_std(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    (squared_deviations(values) / values.len() as f64).sqrt()
}

/// Standard deviation with `ddof = 1`; NaN below two values
pub fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    (squared_deviations(values) / (values.len() - 1) as f64).sqrt()
}

/// `f` over each trailing window of `period` values.
/// Positions before the first full window, and windows holding a NaN, stay NaN.
pub fn rolling<F>(values: &[f64], period: usize, f: F) -> Vec<f64>
where
    F: Fn(&[f64]) -> f64,
{
    let mut result = nan_vec(values.len());
    if period == 0 {
        return result;
    }
    for (end, window) in values.windows(period).enumerate() {
        if window.iter().all(|v| !v.is_nan()) {
            result[end + period - 1] = f(window);
        }
    }
    result
}

/// Successive differences, one shorter than the input
pub fn diff(values: &[f64]) -> Vec<f64> {
    values.windows(2).map(|w| w[1] - w[0]).collect()
}

/// Simple returns aligned with the input; the first position and any
/// change from a zero price are NaN
pub fn pct_change(values: &[f64]) -> Vec<f64> {
    let mut result = nan_vec(values.len());
    for (i, w) in values.windows(2).enumerate() {
        if w[0] != 0.0 {
            result[i + 1] = (w[1] - w[0]) / w[0];
        }
    }
    result
}

/// Split changes into non-negative gains and losses
pub fn gains_losses(changes: &[f64]) -> (Vec<f64>, Vec<f64>) {
    changes.iter().map(|&c| (c.max(0.0), (-c).max(0.0))).unzip()
}

pub fn last_valid(values: &[f64]) -> Option<f64> {
    values.iter().rev().find(|v| !v.is_nan()).copied()
}
