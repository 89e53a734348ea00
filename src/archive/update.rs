use std::collections::{BTreeMap, BTreeSet, HashSet};

use chrono::{Local, NaiveDate};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use super::{cold_start_date, ArchiveStore, DataSource};
use crate::{indicators::IndicatorConfig, PriceBar, Result, TickerError};

/// Worker threads used by a batch when none is configured
pub const DEFAULT_WORKERS: usize = 10;

/// Existing bars followed by fresh ones, one bar per date, sorted by date.
///
/// On a date collision the earlier bar wins, so rows already in the archive
/// are never replaced by a re-fetch.
pub fn merge_bars(existing: &[PriceBar], fresh: &[PriceBar]) -> Vec<PriceBar> {
    let mut seen = HashSet::with_capacity(existing.len() + fresh.len());
    let mut merged: Vec<PriceBar> = existing
        .iter()
        .chain(fresh)
        .filter(|bar| seen.insert(bar.date))
        .copied()
        .collect();
    merged.sort_by_key(|bar| bar.date);
    merged
}

/// What an update did to the archive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateStatus {
    /// The archive already covers today; nothing was fetched
    UpToDate,
    /// The source had nothing after the last saved date
    NoNewData,
    /// New dates were appended and the archive rewritten
    Extended { added: usize },
    /// First download for the symbol
    Created,
    /// No archive and the source had no data; nothing was written
    Empty,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateOutcome {
    pub status: UpdateStatus,
    /// The complete series after the update
    pub bars: Vec<PriceBar>,
}

/// Keeps an [`ArchiveStore`] current from a [`DataSource`]
pub struct ArchiveUpdater<S> {
    store: ArchiveStore,
    source: S,
    indicators: IndicatorConfig,
}

impl<S: DataSource> ArchiveUpdater<S> {
    pub fn new(store: ArchiveStore, source: S) -> Self {
        Self {
            store,
            source,
            indicators: IndicatorConfig::default(),
        }
    }

    /// Indicator columns written alongside the prices
    pub fn with_indicators(mut self, indicators: IndicatorConfig) -> Self {
        self.indicators = indicators;
        self
    }

    pub fn store(&self) -> &ArchiveStore {
        &self.store
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Bring `symbol` up to date as of the local calendar date
    pub fn update(&self, symbol: &str) -> Result<UpdateOutcome> {
        self.update_as_of(symbol, Local::now().date_naive())
    }

    /// Bring `symbol` up to date as of `today`
    pub fn update_as_of(&self, symbol: &str, today: NaiveDate) -> Result<UpdateOutcome> {
        let existing = self.store.load(symbol)?.unwrap_or_default();
        let Some(last) = existing.iter().map(|b| b.date).max() else {
            return self.cold_start(symbol);
        };

        let start = match last.succ_opt() {
            Some(start) if start <= today => start,
            _ => {
                debug!(symbol, %last, "archive is up to date");
                return Ok(UpdateOutcome {
                    status: UpdateStatus::UpToDate,
                    bars: existing,
                });
            }
        };

        let fresh = self.fetch(symbol, start)?;
        if fresh.is_empty() {
            debug!(symbol, %start, "no new data");
            return Ok(UpdateOutcome {
                status: UpdateStatus::NoNewData,
                bars: existing,
            });
        }

        let merged = merge_bars(&existing, &fresh);
        let known: HashSet<NaiveDate> = existing.iter().map(|b| b.date).collect();
        let added = merged.iter().filter(|b| !known.contains(&b.date)).count();
        self.store.save(symbol, &merged, &self.indicators)?;
        info!(symbol, added, rows = merged.len(), "archive extended");

        Ok(UpdateOutcome {
            status: UpdateStatus::Extended { added },
            bars: merged,
        })
    }

    fn cold_start(&self, symbol: &str) -> Result<UpdateOutcome> {
        let fresh = self.fetch(symbol, cold_start_date())?;
        if fresh.is_empty() {
            warn!(symbol, "no data available for new symbol");
            return Ok(UpdateOutcome {
                status: UpdateStatus::Empty,
                bars: Vec::new(),
            });
        }

        let bars = merge_bars(&[], &fresh);
        self.store.save(symbol, &bars, &self.indicators)?;
        info!(symbol, rows = bars.len(), "archive created");

        Ok(UpdateOutcome {
            status: UpdateStatus::Created,
            bars,
        })
    }

    fn fetch(&self, symbol: &str, start: NaiveDate) -> Result<Vec<PriceBar>> {
        self.source
            .fetch(symbol, start)
            .map_err(|source| TickerError::Fetch {
                symbol: symbol.to_string(),
                source,
            })
    }
}

// ============================================================
// BATCH UPDATE
// ============================================================

/// A symbol whose update failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolFailure {
    pub symbol: String,
    pub message: String,
}

/// Per-symbol results of [`batch_update`]
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Complete series of every symbol that updated cleanly
    pub succeeded: BTreeMap<String, Vec<PriceBar>>,
    /// Sorted by symbol
    pub failed: Vec<SymbolFailure>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }
}

/// Update every symbol on a pool of `workers` threads. Duplicate symbols are
/// updated once. A failing symbol is logged and reported without affecting
/// the others; nothing is retried.
pub fn batch_update<S, T>(updater: &ArchiveUpdater<S>, symbols: &[T], workers: usize) -> Result<BatchReport>
where
    S: DataSource,
    T: AsRef<str>,
{
    if workers == 0 {
        return Err(TickerError::InvalidValue("workers must be > 0"));
    }
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .map_err(|e| TickerError::InvalidConfig(format!("worker pool: {e}")))?;

    let unique: BTreeSet<&str> = symbols.iter().map(|s| s.as_ref()).collect();
    let unique: Vec<&str> = unique.into_iter().collect();
    info!(symbols = unique.len(), workers, "starting batch update");

    let results: Vec<(&str, Result<UpdateOutcome>)> = pool.install(|| {
        unique
            .par_iter()
            .map(|&symbol| (symbol, updater.update(symbol)))
            .collect()
    });

    let mut report = BatchReport::default();
    for (symbol, result) in results {
        match result {
            Ok(outcome) => {
                info!(symbol, rows = outcome.bars.len(), status = ?outcome.status, "updated");
                report.succeeded.insert(symbol.to_string(), outcome.bars);
            }
            Err(e) => {
                warn!(symbol, error = %e, "update failed");
                report.failed.push(SymbolFailure {
                    symbol: symbol.to_string(),
                    message: e.to_string(),
                });
            }
        }
    }

    info!(
        succeeded = report.succeeded.len(),
        failed = report.failed.len(),
        "batch update finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::MemorySource;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, day).unwrap()
    }

    fn bar(day: u32, close: f64) -> PriceBar {
        PriceBar::new(d(day), close, close + 1.0, close - 1.0, close, 1000.0)
    }

    #[test]
    fn merge_keeps_first_and_sorts() {
        let existing = vec![bar(1, 10.0), bar(2, 11.0)];
        let fresh = vec![bar(5, 14.0), bar(2, 99.0), bar(3, 12.0)];
        let merged = merge_bars(&existing, &fresh);

        let dates: Vec<_> = merged.iter().map(|b| b.date).collect();
        assert_eq!(dates, vec![d(1), d(2), d(3), d(5)]);
        assert_eq!(merged[1].close, 11.0);
    }

    #[test]
    fn merge_dedupes_within_fresh() {
        let merged = merge_bars(&[], &[bar(3, 1.0), bar(3, 2.0), bar(1, 3.0)]);
        assert_eq!(merged, vec![bar(1, 3.0), bar(3, 1.0)]);
    }

    #[test]
    fn up_to_date_archive_is_not_fetched() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ArchiveStore::new(tmp.path());
        store
            .save("AAPL", &[bar(1, 10.0), bar(2, 11.0)], &IndicatorConfig::default())
            .unwrap();

        let updater = ArchiveUpdater::new(store, MemorySource::new());
        let outcome = updater.update_as_of("AAPL", d(2)).unwrap();
        assert_eq!(outcome.status, UpdateStatus::UpToDate);
        assert_eq!(outcome.bars.len(), 2);
        assert_eq!(updater.source().fetch_count(), 0);
    }

    #[test]
    fn added_counts_new_dates_despite_duplicate_rows() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ArchiveStore::new(tmp.path());
        let saved = [bar(1, 10.0), bar(1, 10.5), bar(2, 11.0), bar(2, 11.5)];
        store.save("DUP", &saved, &IndicatorConfig::default()).unwrap();

        let source = MemorySource::new().with_series("DUP", vec![bar(3, 12.0)]);
        let updater = ArchiveUpdater::new(store, source);
        let outcome = updater.update_as_of("DUP", d(5)).unwrap();

        assert_eq!(outcome.status, UpdateStatus::Extended { added: 1 });
        assert_eq!(outcome.bars, vec![bar(1, 10.0), bar(2, 11.0), bar(3, 12.0)]);
    }

    #[test]
    fn zero_workers_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let updater = ArchiveUpdater::new(ArchiveStore::new(tmp.path()), MemorySource::new());
        assert!(batch_update(&updater, &["AAPL"], 0).is_err());
    }
}
