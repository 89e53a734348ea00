//! Common helpers shared across all detector modules: the epsilon-guarded
//! candle ratios and the high-volume gate.

use serde::{Deserialize, Serialize};

use crate::{rolling, OHLCVExt, Period, Result, TickerError, OHLCV};

/// Added to every denominator that can be zero (flat bars, zero bodies)
pub const EPSILON: f64 = 1e-9;

/// Body as a fraction of the bar's range: `body / (range + eps)`
#[inline]
pub fn body_to_range<T: OHLCV>(bar: &T) -> f64 {
    bar.body() / (bar.range() + EPSILON)
}

/// A shadow measured in bodies: `shadow / (body + eps)`
#[inline]
pub fn shadow_to_body(shadow: f64, body: f64) -> f64 {
    shadow / (body + EPSILON)
}

// ============================================================
// HIGH-VOLUME GATE
// ============================================================

/// Flags rows whose volume z-score over a trailing window exceeds a threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HighVolumeGate {
    pub window: Period,
    pub z_threshold: f64,
}

impl Default for HighVolumeGate {
    fn default() -> Self {
        Self {
            window: Period::new_const(100),
            z_threshold: 1.5,
        }
    }
}

impl HighVolumeGate {
    pub fn validate(&self) -> Result<()> {
        if !self.z_threshold.is_finite() {
            return Err(TickerError::InvalidValue("z_threshold must be finite"));
        }
        Ok(())
    }

    /// One flag per bar; rows before a full window are `false`
    pub fn evaluate<T: OHLCV>(&self, bars: &[T]) -> Vec<bool> {
        let volumes: Vec<f64> = bars.iter().map(|b| b.volume()).collect();
        rolling::rolling_zscore(&volumes, self.window, self.window, EPSILON)
            .into_iter()
            .map(|z| z.is_some_and(|z| z > self.z_threshold))
            .collect()
    }
}

/// Gate flags with the default window (100) and threshold (1.5)
pub fn is_high_volume<T: OHLCV>(bars: &[T]) -> Vec<bool> {
    HighVolumeGate::default().evaluate(bars)
}
