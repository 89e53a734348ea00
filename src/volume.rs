//! Calendar-aware volume normalization
//!
//! Raw volume is heteroskedastic and strongly seasonal by weekday and by
//! calendar events. The normalized value for a row is
//!
//! ```text
//! z      = (volume - rolling_mean) / (rolling_std + eps)      long window
//! ratio  = volume / (mean volume of the same weekday + eps)   whole series
//! scale  = 0.8 if OPEX * 1.1 if holiday-adjacent * 0.9 if quarter end
//! value  = clamp(z / (ratio + eps) * scale, -clip, clip)
//! ```

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::{
    calendar::{CalendarFlags, HolidayCalendar},
    rolling, Period, Result, TickerError, OHLCV,
};

/// Additive guard used by every division in the normalizer
pub const VOLUME_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeConfig {
    /// Rolling z-score window in trading days; half of it is the minimum
    /// number of observations
    pub long_window: Period,
    /// Output is clipped to `[-clip, clip]`
    pub clip: f64,
}

impl Default for VolumeConfig {
    fn default() -> Self {
        Self {
            long_window: Period::new_const(252),
            clip: 5.0,
        }
    }
}

impl VolumeConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.clip.is_finite() || self.clip <= 0.0 {
            return Err(TickerError::OutOfRange {
                field: "clip",
                value: self.clip,
                min: f64::MIN_POSITIVE,
                max: f64::MAX,
            });
        }
        Ok(())
    }

    fn min_periods(&self) -> Period {
        Period::new_const((self.long_window.get() / 2).max(1))
    }
}

/// Normalized volume per row; `None` while the long window lacks history.
///
/// Bars must carry dates and be sorted ascending.
pub fn normalize_volume<T: OHLCV>(bars: &[T], config: &VolumeConfig) -> Result<Vec<Option<f64>>> {
    let dates = sorted_dates(bars)?;
    let (Some(&first), Some(&last)) = (dates.first(), dates.last()) else {
        return Ok(Vec::new());
    };

    let volumes: Vec<f64> = bars.iter().map(|b| b.volume()).collect();
    let zscores = rolling::rolling_zscore(
        &volumes,
        config.long_window,
        config.min_periods(),
        VOLUME_EPSILON,
    );
    let weekday_means = weekday_means(&dates, &volumes);
    let holidays = HolidayCalendar::us_federal(first, last);

    let normalized = dates
        .iter()
        .zip(&volumes)
        .zip(zscores)
        .map(|((&date, &volume), z)| {
            let z = z?;
            let weekday_mean = weekday_means[weekday_index(date)];
            let ratio = volume / (weekday_mean + VOLUME_EPSILON);
            let scale = CalendarFlags::for_date(date, &holidays).scale();
            Some(normalized_value(z, ratio, scale, config.clip))
        })
        .collect();

    Ok(normalized)
}

/// Final step of the pipeline for one row
#[inline]
pub fn normalized_value(zscore: f64, weekday_ratio: f64, scale: f64, clip: f64) -> f64 {
    (zscore / (weekday_ratio + VOLUME_EPSILON) * scale).clamp(-clip, clip)
}

fn sorted_dates<T: OHLCV>(bars: &[T]) -> Result<Vec<NaiveDate>> {
    let mut dates = Vec::with_capacity(bars.len());
    for (index, bar) in bars.iter().enumerate() {
        let date = bar.date().ok_or(TickerError::MissingDate { index })?;
        if dates.last().is_some_and(|&prev| date < prev) {
            return Err(TickerError::Unsorted { index });
        }
        dates.push(date);
    }
    Ok(dates)
}

#[inline]
fn weekday_index(date: NaiveDate) -> usize {
    date.weekday().num_days_from_monday() as usize
}

/// Mean volume per weekday, Monday first. Weekdays with no rows read 0.
fn weekday_means(dates: &[NaiveDate], volumes: &[f64]) -> [f64; 7] {
    let mut sums = [0.0; 7];
    let mut counts = [0usize; 7];
    for (&date, &v) in dates.iter().zip(volumes) {
        if v.is_nan() {
            continue;
        }
        let w = weekday_index(date);
        sums[w] += v;
        counts[w] += 1;
    }

    let mut means = [0.0; 7];
    for w in 0..7 {
        if counts[w] > 0 {
            means[w] = sums[w] / counts[w] as f64;
        }
    }
    means
}
