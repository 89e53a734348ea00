//! Two-bar candlestick pattern detectors: Bullish and Bearish Engulfing
//!
//! Both compare the current bar's open/close against the previous bar's.
//! Row 0 has no predecessor and never matches.

use super::{BEARISH_ENGULFING, BULLISH_ENGULFING};
use crate::{OHLCVExt, PatternDetector, PatternId, OHLCV};

impl_with_defaults!(BullishEngulfingDetector, BearishEngulfingDetector);

fn pair<T: OHLCV>(bars: &[T], index: usize) -> Option<(&T, &T)> {
    if index < 1 {
        return None;
    }
    Some((bars.get(index - 1)?, bars.get(index)?))
}

// ============================================================
// ENGULFING PATTERNS
// ============================================================

/// Bullish Engulfing - a down bar followed by an up bar opening below the
/// prior close and closing above the prior open
#[derive(Debug, Clone, Copy, Default)]
pub struct BullishEngulfingDetector;

impl PatternDetector for BullishEngulfingDetector {
    fn id(&self) -> PatternId {
        BULLISH_ENGULFING
    }

    fn min_bars(&self) -> usize {
        2
    }

    fn matches_at<T: OHLCV>(&self, bars: &[T], index: usize) -> bool {
        let Some((prev, cur)) = pair(bars, index) else {
            return false;
        };
        prev.is_bearish()
            && cur.is_bullish()
            && cur.open() < prev.close()
            && cur.close() > prev.open()
    }
}

/// Bearish Engulfing - an up bar followed by a down bar opening above the
/// prior close and closing below the prior open
#[derive(Debug, Clone, Copy, Default)]
pub struct BearishEngulfingDetector;

impl PatternDetector for BearishEngulfingDetector {
    fn id(&self) -> PatternId {
        BEARISH_ENGULFING
    }

    fn min_bars(&self) -> usize {
        2
    }

    fn matches_at<T: OHLCV>(&self, bars: &[T], index: usize) -> bool {
        let Some((prev, cur)) = pair(bars, index) else {
            return false;
        };
        prev.is_bullish()
            && cur.is_bearish()
            && cur.open() > prev.close()
            && cur.close() < prev.open()
    }
}
