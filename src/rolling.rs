//! Trailing rolling-window statistics
//!
//! Windows end at the current row and reach back `window` rows. A window
//! produces a value only once it holds `min_periods` observations; `NaN`
//! inputs are not observations. Standard deviation is the sample estimate
//! (n - 1 denominator).

use crate::Period;

/// Observation count, mean and sample standard deviation of a window.
/// Std is `None` below two observations.
fn window_stats(window: &[f64]) -> (usize, f64, Option<f64>) {
    let mut n = 0usize;
    let mut sum = 0.0;
    for &v in window {
        if !v.is_nan() {
            n += 1;
            sum += v;
        }
    }
    if n == 0 {
        return (0, f64::NAN, None);
    }
    let mean = sum / n as f64;
    if n < 2 {
        return (n, mean, None);
    }
    let ss: f64 = window
        .iter()
        .filter(|v| !v.is_nan())
        .map(|v| (v - mean) * (v - mean))
        .sum();
    (n, mean, Some((ss / (n - 1) as f64).sqrt()))
}

#[inline]
fn window_at(values: &[f64], index: usize, window: Period) -> &[f64] {
    let start = (index + 1).saturating_sub(window.get());
    &values[start..=index]
}

/// Trailing mean over `window` rows
pub fn rolling_mean(values: &[f64], window: Period, min_periods: Period) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| {
            let (n, mean, _) = window_stats(window_at(values, i, window));
            (n >= min_periods.get()).then_some(mean)
        })
        .collect()
}

/// Trailing sample standard deviation over `window` rows
pub fn rolling_std(values: &[f64], window: Period, min_periods: Period) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| {
            let (n, _, std) = window_stats(window_at(values, i, window));
            if n >= min_periods.get() {
                std
            } else {
                None
            }
        })
        .collect()
}

/// Trailing z-score `(x - mean) / (std + eps)` of each row against its own window
pub fn rolling_zscore(
    values: &[f64],
    window: Period,
    min_periods: Period,
    eps: f64,
) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| {
            let (n, mean, std) = window_stats(window_at(values, i, window));
            if n < min_periods.get() || values[i].is_nan() {
                return None;
            }
            std.map(|s| (values[i] - mean) / (s + eps))
        })
        .collect()
}
