//! Single-bar candlestick pattern detectors: Hammer, Shooting Star
//!
//! Both compare the real body against the bar's range and the shadows
//! against the body. A flat bar (zero range) has a body ratio of 0; a zero
//! body makes any non-zero shadow "long".

use super::helpers::{body_to_range, shadow_to_body};
use super::{HAMMER, SHOOTING_STAR};
use crate::{OHLCVExt, PatternDetector, PatternId, Ratio, Result, TickerError, OHLCV};

impl_with_defaults!(HammerDetector, ShootingStarDetector);

fn check_tail_ratio(value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(TickerError::OutOfRange {
            field: "tail_ratio",
            value,
            min: f64::MIN_POSITIVE,
            max: f64::MAX,
        });
    }
    Ok(())
}

// ============================================================
// HAMMER
// ============================================================

/// Hammer - small body near the top of the range, long lower shadow
#[derive(Debug, Clone, Copy)]
pub struct HammerDetector {
    /// body / range must stay below this
    pub body_ratio: Ratio,
    /// lower shadow / body must exceed this
    pub lower_tail_ratio: f64,
    /// upper shadow / body must stay below this
    pub upper_tail_ratio: f64,
}

impl Default for HammerDetector {
    fn default() -> Self {
        Self {
            body_ratio: Ratio::new_const(0.5),
            lower_tail_ratio: 2.0,
            upper_tail_ratio: 0.5,
        }
    }
}

impl PatternDetector for HammerDetector {
    fn id(&self) -> PatternId {
        HAMMER
    }

    fn min_bars(&self) -> usize {
        1
    }

    fn matches_at<T: OHLCV>(&self, bars: &[T], index: usize) -> bool {
        let Some(bar) = bars.get(index) else {
            return false;
        };
        let body = bar.body();
        let lower = bar.lower_shadow();
        let upper = bar.upper_shadow();

        body_to_range(bar) < self.body_ratio.get()
            && shadow_to_body(lower, body) > self.lower_tail_ratio
            && lower > upper
            && shadow_to_body(upper, body) < self.upper_tail_ratio
    }

    fn validate_config(&self) -> Result<()> {
        check_tail_ratio(self.lower_tail_ratio)?;
        check_tail_ratio(self.upper_tail_ratio)
    }
}

// ============================================================
// SHOOTING STAR
// ============================================================

/// Shooting Star - small body near the bottom of the range, long upper shadow
#[derive(Debug, Clone, Copy)]
pub struct ShootingStarDetector {
    pub body_ratio: Ratio,
    /// upper shadow / body must exceed this
    pub upper_tail_ratio: f64,
}

impl Default for ShootingStarDetector {
    fn default() -> Self {
        Self {
            body_ratio: Ratio::new_const(0.25),
            upper_tail_ratio: 2.0,
        }
    }
}

impl PatternDetector for ShootingStarDetector {
    fn id(&self) -> PatternId {
        SHOOTING_STAR
    }

    fn min_bars(&self) -> usize {
        1
    }

    fn matches_at<T: OHLCV>(&self, bars: &[T], index: usize) -> bool {
        let Some(bar) = bars.get(index) else {
            return false;
        };
        let body = bar.body();
        let upper = bar.upper_shadow();

        body_to_range(bar) < self.body_ratio.get()
            && shadow_to_body(upper, body) > self.upper_tail_ratio
            && upper > bar.lower_shadow()
    }

    fn validate_config(&self) -> Result<()> {
        check_tail_ratio(self.upper_tail_ratio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Candle(f64, f64, f64, f64);

    impl OHLCV for Candle {
        fn open(&self) -> f64 {
            self.0
        }
        fn high(&self) -> f64 {
            self.1
        }
        fn low(&self) -> f64 {
            self.2
        }
        fn close(&self) -> f64 {
            self.3
        }
        fn volume(&self) -> f64 {
            1.0
        }
    }

    #[test]
    fn hammer_shape() {
        let d = HammerDetector::with_defaults();
        assert!(d.matches_at(&[Candle(100.0, 100.25, 98.0, 100.2)], 0));
        // long upper shadow disqualifies
        assert!(!d.matches_at(&[Candle(100.0, 101.0, 98.0, 100.2)], 0));
        // big body disqualifies
        assert!(!d.matches_at(&[Candle(100.0, 102.1, 98.0, 102.0)], 0));
        assert!(!d.matches_at::<Candle>(&[], 0));
    }

    #[test]
    fn doji_hammer_is_accepted() {
        // zero body, long lower shadow, no upper shadow
        let d = HammerDetector::with_defaults();
        assert!(d.matches_at(&[Candle(100.0, 100.0, 97.0, 100.0)], 0));
    }

    #[test]
    fn flat_bar_is_not_a_pattern() {
        let bar = [Candle(100.0, 100.0, 100.0, 100.0)];
        assert!(!HammerDetector::with_defaults().matches_at(&bar, 0));
        assert!(!ShootingStarDetector::with_defaults().matches_at(&bar, 0));
    }

    #[test]
    fn shooting_star_shape() {
        let d = ShootingStarDetector::with_defaults();
        assert!(d.matches_at(&[Candle(100.0, 102.0, 99.85, 99.9)], 0));
        assert!(!d.matches_at(&[Candle(100.0, 100.25, 98.0, 100.2)], 0));
    }

    #[test]
    fn tail_ratio_validation() {
        let bad = HammerDetector {
            upper_tail_ratio: f64::NAN,
            ..HammerDetector::default()
        };
        assert!(bad.validate_config().is_err());
        assert!(ShootingStarDetector::default().validate_config().is_ok());
    }
}
