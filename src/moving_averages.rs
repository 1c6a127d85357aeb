//! Trailing averages used by the dashboard charts and the model features.

use crate::common::nan_vec;

/// Mean of the trailing `period` values. A window that contains a NaN is
/// NaN, and the average recovers once the NaN has left the window.
///
/// # Example
/// ```
/// use sol_predictor::sma;
/// let result = sma(&[2.0, 4.0, 6.0, 8.0, 10.0], 3);
/// assert!(result[1].is_nan());
/// assert_eq!(result[2], 4.0);
/// assert_eq!(result[4], 8.0);
/// ```
pub fn sma(values: &[f64], period: usize) -> Vec<f64> {
    let mut result = nan_vec(values.len());
    if period == 0 {
        return result;
    }

    // running sum over the defined values in the window
    let mut sum = 0.0;
    let mut missing = 0usize;
    for (i, &x) in values.iter().enumerate() {
        if x.is_nan() {
            missing += 1;
        } else {
            sum += x;
        }
        if i >= period {
            let old = values[i - period];
            if old.is_nan() {
                missing -= 1;
            } else {
                sum -= old;
            }
        }
        if i + 1 >= period && missing == 0 {
            result[i] = sum / period as f64;
        }
    }

    result
}

/// Exponentially weighted average with smoothing `2 / (period + 1)`.
///
/// Seeded with the first value, so every position is defined; this is the
/// unadjusted `ewm` recursion `avg = x * k + prev * (1 - k)`.
///
/// # Example
/// ```
/// use sol_predictor::ema;
/// let result = ema(&[10.0, 20.0], 3);
/// assert_eq!(result, vec![10.0, 15.0]);
/// ```
pub fn ema(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    if n == 0 || period == 0 {
        return nan_vec(n);
    }

    let multiplier = 2.0 / (period as f64 + 1.0);
    let mut result = Vec::with_capacity(n);
    result.push(values[0]);

    for i in 1..n {
        let prev = result[i - 1];
        let next = if prev.is_nan() {
            values[i] // Re-seed after a NaN input
        } else if values[i].is_nan() {
            prev
        } else {
            values[i] * multiplier + prev * (1.0 - multiplier)
        };
        result.push(next);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_sma_warmup_and_values() {
        let v = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let r = sma(&v, 2);
        assert!(r[0].is_nan());
        assert_eq!(&r[1..], &[1.5, 2.5, 3.5, 4.5]);
    }

    #[test]
    fn test_sma_recovers_after_nan() {
        let r = sma(&[1.0, f64::NAN, 3.0, 5.0, 7.0], 2);
        assert!(r[1].is_nan() && r[2].is_nan());
        assert_eq!(&r[3..], &[4.0, 6.0]);
    }

    #[test]
    fn test_sma_short_input() {
        let r = sma(&[1.0, 2.0], 5);
        assert_eq!(r.len(), 2);
        assert!(r.iter().all(|x| x.is_nan()));
    }

    #[test]
    fn test_ema_recursion() {
        let v = vec![1.0, 2.0, 3.0, 4.0];
        let r = ema(&v, 3);
        // k = 0.5
        assert_relative_eq!(r[0], 1.0);
        assert_relative_eq!(r[1], 1.5);
        assert_relative_eq!(r[2], 2.25);
        assert_relative_eq!(r[3], 3.125);
    }

    #[test]
    fn test_ema_constant_series() {
        let r = ema(&[7.0; 30], 12);
        assert!(r.iter().all(|&x| (x - 7.0).abs() < 1e-12));
    }

    #[test]
    fn test_ema_empty() {
        assert!(ema(&[], 10).is_empty());
    }
}
