//! Moving averages and momentum oscillators over close prices
//!
//! Every indicator is trailing: the value at row `i` depends on rows `0..=i`
//! only. Rows without enough history carry `None`, never zero.

use serde::{Deserialize, Serialize};

use crate::{rolling, Period, Result, TickerError, OHLCV};

/// Additive guard against a zero average loss
pub const RSI_EPSILON: f64 = 1e-9;

/// Windows used by [`compute_indicators`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorConfig {
    /// SMA and EMA windows, in output column order
    pub ma_windows: Vec<Period>,
    pub rsi_window: Period,
    pub macd_fast: Period,
    pub macd_slow: Period,
    pub macd_signal: Period,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            ma_windows: vec![
                Period::new_const(20),
                Period::new_const(50),
                Period::new_const(100),
                Period::new_const(200),
            ],
            rsi_window: Period::new_const(14),
            macd_fast: Period::new_const(12),
            macd_slow: Period::new_const(26),
            macd_signal: Period::new_const(9),
        }
    }
}

impl IndicatorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.ma_windows.is_empty() {
            return Err(TickerError::InvalidConfig(
                "ma_windows must list at least one window".into(),
            ));
        }
        if self.macd_fast >= self.macd_slow {
            return Err(TickerError::InvalidConfig(format!(
                "macd_fast ({}) must be shorter than macd_slow ({})",
                self.macd_fast, self.macd_slow
            )));
        }
        Ok(())
    }
}

/// Simple moving average of `values` over `window` rows
pub fn sma(values: &[f64], window: Period) -> Vec<Option<f64>> {
    rolling::rolling_mean(values, window, window)
}

/// Exponential moving average with `alpha = 2 / (span + 1)`, seeded by the
/// first value. Defined for every row.
pub fn ema(values: &[f64], span: Period) -> Vec<f64> {
    let alpha = 2.0 / (span.get() as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());
    let mut prev: Option<f64> = None;

    for &v in values {
        let next = match prev {
            None => v,
            Some(p) => alpha * v + (1.0 - alpha) * p,
        };
        out.push(next);
        prev = Some(next);
    }

    out
}

/// Relative strength index from simple rolling means of gains and losses.
///
/// The first delta is undefined, so the first `window` rows are `None`.
pub fn rsi(closes: &[f64], window: Period) -> Vec<Option<f64>> {
    if closes.is_empty() {
        return Vec::new();
    }

    let mut gains = Vec::with_capacity(closes.len());
    let mut losses = Vec::with_capacity(closes.len());
    gains.push(f64::NAN);
    losses.push(f64::NAN);
    for w in closes.windows(2) {
        let delta = w[1] - w[0];
        gains.push(delta.max(0.0));
        losses.push((-delta).max(0.0));
    }

    let avg_gain = rolling::rolling_mean(&gains, window, window);
    let avg_loss = rolling::rolling_mean(&losses, window, window);

    avg_gain
        .into_iter()
        .zip(avg_loss)
        .map(|(g, l)| {
            let (g, l) = (g?, l?);
            let rs = g / (l + RSI_EPSILON);
            Some(100.0 - 100.0 / (1.0 + rs))
        })
        .collect()
}

/// One row of MACD output
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MacdPoint {
    pub line: f64,
    pub signal: f64,
    pub histogram: f64,
}

/// MACD line `EMA(fast) - EMA(slow)`, its EMA(signal), and their difference
pub fn macd(closes: &[f64], fast: Period, slow: Period, signal: Period) -> Vec<MacdPoint> {
    let fast_ema = ema(closes, fast);
    let slow_ema = ema(closes, slow);
    let line: Vec<f64> = fast_ema.iter().zip(&slow_ema).map(|(f, s)| f - s).collect();
    let signal_line = ema(&line, signal);

    line.iter()
        .zip(&signal_line)
        .map(|(&line, &signal)| MacdPoint {
            line,
            signal,
            histogram: line - signal,
        })
        .collect()
}

/// Column-oriented indicator output; `sma[k]` and `ema[k]` belong to
/// `config.ma_windows[k]`.
#[derive(Debug, Clone, Default)]
pub struct IndicatorSet {
    pub ema: Vec<Vec<f64>>,
    pub sma: Vec<Vec<Option<f64>>>,
    pub rsi: Vec<Option<f64>>,
    pub macd: Vec<MacdPoint>,
}

/// Compute every configured indicator over the close prices of `bars`
pub fn compute_indicators<T: OHLCV>(bars: &[T], config: &IndicatorConfig) -> IndicatorSet {
    let closes: Vec<f64> = bars.iter().map(|b| b.close()).collect();

    IndicatorSet {
        ema: config.ma_windows.iter().map(|&w| ema(&closes, w)).collect(),
        sma: config.ma_windows.iter().map(|&w| sma(&closes, w)).collect(),
        rsi: rsi(&closes, config.rsi_window),
        macd: macd(
            &closes,
            config.macd_fast,
            config.macd_slow,
            config.macd_signal,
        ),
    }
}

/// Archive column names for `config`, in [`IndicatorSet::row_fields`] order
pub fn column_names(config: &IndicatorConfig) -> Vec<String> {
    let mut names = Vec::with_capacity(config.ma_windows.len() * 2 + 4);
    names.extend(config.ma_windows.iter().map(|w| format!("ema_{w}")));
    names.extend(config.ma_windows.iter().map(|w| format!("sma_{w}")));
    names.push(format!("rsi_{}", config.rsi_window));
    names.extend(["macd_line", "macd_signal", "macd_hist"].map(String::from));
    names
}

impl IndicatorSet {
    /// Values of row `i` as optional floats, matching [`column_names`]
    pub fn row_fields(&self, i: usize) -> Vec<Option<f64>> {
        let mut fields = Vec::with_capacity(self.ema.len() * 2 + 4);
        fields.extend(self.ema.iter().map(|col| Some(col[i])));
        fields.extend(self.sma.iter().map(|col| col[i]));
        fields.push(self.rsi[i]);
        let m = self.macd[i];
        fields.extend([Some(m.line), Some(m.signal), Some(m.histogram)]);
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(n: usize) -> Period {
        Period::new(n).unwrap()
    }

    fn ascending(n: usize) -> Vec<f64> {
        (1..=n).map(|i| i as f64).collect()
    }

    #[test]
    fn ema_known_values() {
        let out = ema(&[10.0, 11.0, 12.0], p(2));
        let rounded: Vec<f64> = out.iter().map(|v| (v * 1000.0).round() / 1000.0).collect();
        assert_eq!(rounded, vec![10.0, 10.667, 11.556]);
    }

    #[test]
    fn ema_empty_input() {
        assert!(ema(&[], p(5)).is_empty());
    }

    #[test]
    fn sma_leading_rows_missing() {
        let out = sma(&ascending(5), p(3));
        assert_eq!(out, vec![None, None, Some(2.0), Some(3.0), Some(4.0)]);
    }

    #[test]
    fn rsi_first_window_rows_missing() {
        let out = rsi(&ascending(20), p(14));
        assert!(out[..14].iter().all(Option::is_none));
        assert!(out[14..].iter().all(Option::is_some));
    }

    #[test]
    fn rsi_monotonic_series() {
        let up = rsi(&ascending(30), p(14));
        assert!(up[29].unwrap() > 99.9);

        let down: Vec<f64> = ascending(30).into_iter().rev().collect();
        let down = rsi(&down, p(14));
        assert!(down[29].unwrap() < 1e-6);
    }

    #[test]
    fn rsi_flat_series_is_zero() {
        let out = rsi(&[50.0; 20], p(14));
        assert_eq!(out[19], Some(0.0));
    }

    #[test]
    fn macd_flat_series_is_zero() {
        let out = macd(&[100.0; 50], p(12), p(26), p(9));
        assert!(out.iter().all(|m| m.line == 0.0 && m.signal == 0.0 && m.histogram == 0.0));
    }

    #[test]
    fn macd_histogram_is_line_minus_signal() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + (i as f64 * 0.2).sin() * 3.0).collect();
        for m in macd(&closes, p(12), p(26), p(9)) {
            assert!((m.histogram - (m.line - m.signal)).abs() < 1e-12);
        }
    }

    #[test]
    fn config_rejects_inverted_macd() {
        let config = IndicatorConfig {
            macd_fast: p(26),
            macd_slow: p(12),
            ..IndicatorConfig::default()
        };
        assert!(config.validate().is_err());
        assert!(IndicatorConfig::default().validate().is_ok());
    }

    #[test]
    fn column_names_follow_window_order() {
        let names = column_names(&IndicatorConfig::default());
        assert_eq!(names[0], "ema_20");
        assert_eq!(names[4], "sma_20");
        assert_eq!(names[8], "rsi_14");
        assert_eq!(&names[9..], ["macd_line", "macd_signal", "macd_hist"]);
    }
}
