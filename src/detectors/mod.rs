//! Candlestick pattern detectors
//!
//! Every detector is a pure shape test combined with the high-volume gate
//! from [`helpers::HighVolumeGate`]: a pattern on a low-volume day is never
//! signaled.
//!
//! # Pattern Categories
//!
//! - **Single-bar**: Hammer, Shooting Star
//! - **Two-bar**: Bullish Engulfing, Bearish Engulfing
//! - **Three-bar**: Morning Star

use crate::{PatternDetector, PatternId, OHLCV};

pub mod helpers;

/// Generate `with_defaults()` -> `Self::default()` for multiple detector types.
macro_rules! impl_with_defaults {
  ($($detector:ty),* $(,)?) => {
    $(impl $detector {
      pub fn with_defaults() -> Self { Self::default() }
    })*
  };
}

pub mod single_bar;
pub mod three_bar;
pub mod two_bar;

// Re-export all detectors for convenience
pub use helpers::*;
pub use single_bar::*;
pub use three_bar::*;
pub use two_bar::*;

pub const HAMMER: PatternId = PatternId("hammer");
pub const BULLISH_ENGULFING: PatternId = PatternId("bullish_engulfing");
pub const BEARISH_ENGULFING: PatternId = PatternId("bearish_engulfing");
pub const MORNING_STAR: PatternId = PatternId("morning_star");
pub const SHOOTING_STAR: PatternId = PatternId("shooting_star");

/// Every builtin pattern, in output column order
pub const ALL_PATTERNS: [PatternId; 5] = [
    HAMMER,
    BULLISH_ENGULFING,
    BEARISH_ENGULFING,
    MORNING_STAR,
    SHOOTING_STAR,
];

/// Hammer flags with default thresholds and the default volume gate
pub fn detect_hammer<T: OHLCV>(bars: &[T]) -> Vec<bool> {
    HammerDetector::default().detect(bars, &is_high_volume(bars))
}

pub fn detect_bullish_engulfing<T: OHLCV>(bars: &[T]) -> Vec<bool> {
    BullishEngulfingDetector.detect(bars, &is_high_volume(bars))
}

pub fn detect_bearish_engulfing<T: OHLCV>(bars: &[T]) -> Vec<bool> {
    BearishEngulfingDetector.detect(bars, &is_high_volume(bars))
}

pub fn detect_morning_star<T: OHLCV>(bars: &[T]) -> Vec<bool> {
    MorningStarDetector::default().detect(bars, &is_high_volume(bars))
}

pub fn detect_shooting_star<T: OHLCV>(bars: &[T]) -> Vec<bool> {
    ShootingStarDetector::default().detect(bars, &is_high_volume(bars))
}
