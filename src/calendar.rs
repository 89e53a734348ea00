//! Market calendar helpers: US federal holidays, business-day arithmetic and
//! the per-date flags used by the volume normalizer.
//!
//! Holidays are the observed US federal holidays. Fixed-date holidays that
//! fall on a Saturday are observed the Friday before, on a Sunday the Monday
//! after. Business days are Monday to Friday; holidays are not skipped when
//! shifting by business days.

use std::collections::BTreeSet;

use chrono::{Datelike, Duration, NaiveDate, Weekday};

/// Observed US federal holidays within a closed date range
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HolidayCalendar {
    holidays: BTreeSet<NaiveDate>,
    adjacent: BTreeSet<NaiveDate>,
}

impl HolidayCalendar {
    /// Holidays observed between `start` and `end`, both inclusive
    pub fn us_federal(start: NaiveDate, end: NaiveDate) -> Self {
        if end < start {
            return Self::default();
        }

        // New Year's Day of `end.year() + 1` may be observed on Dec 31.
        let holidays: BTreeSet<NaiveDate> = (start.year()..=end.year() + 1)
            .flat_map(federal_holidays)
            .filter(|d| (start..=end).contains(d))
            .collect();
        let adjacent = holidays
            .iter()
            .flat_map(|&h| [add_business_days(h, -1), add_business_days(h, 1)])
            .collect();

        Self { holidays, adjacent }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.holidays.contains(&date)
    }

    pub fn iter(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.holidays.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.holidays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.holidays.is_empty()
    }

    /// True iff `date` is exactly one business day before or after a holiday
    pub fn is_adjacent(&self, date: NaiveDate) -> bool {
        self.adjacent.contains(&date)
    }
}

fn federal_holidays(year: i32) -> Vec<NaiveDate> {
    let fixed = |month, day| NaiveDate::from_ymd_opt(year, month, day).map(nearest_workday);

    let mut days = vec![
        fixed(1, 1),
        nth_weekday(year, 2, Weekday::Mon, 3),
        last_weekday(year, 5, Weekday::Mon),
        fixed(7, 4),
        nth_weekday(year, 9, Weekday::Mon, 1),
        nth_weekday(year, 10, Weekday::Mon, 2),
        fixed(11, 11),
        nth_weekday(year, 11, Weekday::Thu, 4),
        fixed(12, 25),
    ];
    if year >= 1986 {
        days.push(nth_weekday(year, 1, Weekday::Mon, 3));
    }
    if year >= 2021 {
        days.push(fixed(6, 19));
    }

    days.into_iter().flatten().collect()
}

fn nearest_workday(date: NaiveDate) -> NaiveDate {
    match date.weekday() {
        Weekday::Sat => date - Duration::days(1),
        Weekday::Sun => date + Duration::days(1),
        _ => date,
    }
}

fn nth_weekday(year: i32, month: u32, weekday: Weekday, n: u8) -> Option<NaiveDate> {
    NaiveDate::from_weekday_of_month_opt(year, month, weekday, n)
}

fn last_weekday(year: i32, month: u32, weekday: Weekday) -> Option<NaiveDate> {
    let last = last_day_of_month(year, month)?;
    let back = (7 + last.weekday().num_days_from_monday() - weekday.num_days_from_monday()) % 7;
    Some(last - Duration::days(i64::from(back)))
}

fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let (y, m) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(y, m, 1)?.pred_opt()
}

pub fn is_business_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Shift `date` by `n` Monday-to-Friday days. A weekend start rolls to the
/// adjacent business day in the direction of travel first.
pub fn add_business_days(date: NaiveDate, n: i64) -> NaiveDate {
    let step = if n >= 0 { 1 } else { -1 };
    let mut d = date;
    let mut remaining = n.abs();

    if !is_business_day(d) && remaining > 0 {
        while !is_business_day(d) {
            d += Duration::days(step);
        }
        remaining -= 1;
    }
    while remaining > 0 {
        d += Duration::days(step);
        if is_business_day(d) {
            remaining -= 1;
        }
    }
    d
}

/// Third-Friday options expiration heuristic: a Friday on day 15..=21
pub fn is_opex(date: NaiveDate) -> bool {
    date.weekday() == Weekday::Fri && (15..=21).contains(&date.day())
}

/// Last calendar day of March, June, September or December
pub fn is_quarter_end(date: NaiveDate) -> bool {
    matches!(date.month(), 3 | 6 | 9 | 12)
        && last_day_of_month(date.year(), date.month()) == Some(date)
}

pub const OPEX_SCALE: f64 = 0.8;
pub const HOLIDAY_ADJACENT_SCALE: f64 = 1.1;
pub const QUARTER_END_SCALE: f64 = 0.9;

/// Calendar effects for one trading date
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CalendarFlags {
    pub opex: bool,
    pub holiday_adjacent: bool,
    pub quarter_end: bool,
}

impl CalendarFlags {
    pub fn for_date(date: NaiveDate, holidays: &HolidayCalendar) -> Self {
        Self {
            opex: is_opex(date),
            holiday_adjacent: holidays.is_adjacent(date),
            quarter_end: is_quarter_end(date),
        }
    }

    /// Multiplicative volume scale; flags compound independently
    pub fn scale(&self) -> f64 {
        let mut scale = 1.0;
        if self.opex {
            scale *= OPEX_SCALE;
        }
        if self.holiday_adjacent {
            scale *= HOLIDAY_ADJACENT_SCALE;
        }
        if self.quarter_end {
            scale *= QUARTER_END_SCALE;
        }
        scale
    }
}
