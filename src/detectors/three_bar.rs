//! Three-bar candlestick pattern detectors: Morning Star

use super::helpers::body_to_range;
use super::MORNING_STAR;
use crate::{OHLCVExt, PatternDetector, PatternId, Ratio, OHLCV};

impl_with_defaults!(MorningStarDetector);

// ============================================================
// STAR PATTERNS
// ============================================================

/// Morning Star - a down bar, a small-bodied pause, then an up bar closing
/// above the midpoint of the first bar's body
#[derive(Debug, Clone, Copy)]
pub struct MorningStarDetector {
    /// body / range of the middle bar must stay below this
    pub pause_body_ratio: Ratio,
}

impl Default for MorningStarDetector {
    fn default() -> Self {
        Self {
            pause_body_ratio: Ratio::new_const(0.3),
        }
    }
}

impl PatternDetector for MorningStarDetector {
    fn id(&self) -> PatternId {
        MORNING_STAR
    }

    fn min_bars(&self) -> usize {
        3
    }

    fn matches_at<T: OHLCV>(&self, bars: &[T], index: usize) -> bool {
        if index < 2 {
            return false;
        }
        let (Some(first), Some(pause), Some(third)) =
            (bars.get(index - 2), bars.get(index - 1), bars.get(index))
        else {
            return false;
        };

        let midpoint = (first.open() + first.close()) / 2.0;
        first.is_bearish()
            && body_to_range(pause) < self.pause_body_ratio.get()
            && third.is_bullish()
            && third.close() > midpoint
    }
}
