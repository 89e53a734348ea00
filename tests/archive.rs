//! Integration tests for the incremental archive updater.

use std::fs;

use chrono::{Duration, NaiveDate};
use tickers::{indicators::IndicatorConfig, prelude::*};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn bars_from(start: NaiveDate, n: usize, close: f64) -> Vec<PriceBar> {
    (0..n)
        .map(|i| {
            let c = close + i as f64 * 0.5;
            PriceBar::new(start + Duration::days(i as i64), c - 0.2, c + 1.0, c - 1.0, c, 10_000.0)
        })
        .collect()
}

#[test]
fn cold_start_writes_sorted_archive() {
    let tmp = tempfile::tempdir().unwrap();
    let mut history = bars_from(d(2024, 1, 1), 10, 50.0);
    history.reverse();
    let source = MemorySource::new().with_series("AAPL", history);
    let updater = ArchiveUpdater::new(ArchiveStore::new(tmp.path()), source);

    let outcome = updater.update_as_of("AAPL", d(2024, 1, 20)).unwrap();
    assert_eq!(outcome.status, UpdateStatus::Created);
    assert_eq!(outcome.bars, bars_from(d(2024, 1, 1), 10, 50.0));
    assert_eq!(
        updater.store().last_saved_date("AAPL").unwrap(),
        Some(d(2024, 1, 10))
    );
}

#[test]
fn cold_start_without_data_writes_nothing() {
    let tmp = tempfile::tempdir().unwrap();
    let updater = ArchiveUpdater::new(ArchiveStore::new(tmp.path()), MemorySource::new());

    let outcome = updater.update_as_of("NEW", d(2024, 1, 20)).unwrap();
    assert_eq!(outcome.status, UpdateStatus::Empty);
    assert!(outcome.bars.is_empty());
    assert!(!updater.store().exists("NEW"));
}

#[test]
fn update_appends_new_dates() {
    let tmp = tempfile::tempdir().unwrap();
    let store = ArchiveStore::new(tmp.path());
    store
        .save("MSFT", &bars_from(d(2024, 1, 1), 5, 50.0), &IndicatorConfig::default())
        .unwrap();

    let source = MemorySource::new().with_series("MSFT", bars_from(d(2024, 1, 1), 8, 50.0));
    let updater = ArchiveUpdater::new(store, source);
    let outcome = updater.update_as_of("MSFT", d(2024, 1, 31)).unwrap();

    assert_eq!(outcome.status, UpdateStatus::Extended { added: 3 });
    assert_eq!(outcome.bars, bars_from(d(2024, 1, 1), 8, 50.0));
    assert_eq!(updater.store().load("MSFT").unwrap().unwrap(), outcome.bars);
}

#[test]
fn existing_rows_win_over_refetched_ones() {
    let tmp = tempfile::tempdir().unwrap();
    let store = ArchiveStore::new(tmp.path());
    let saved = bars_from(d(2024, 1, 1), 3, 50.0);
    store.save("IBM", &saved, &IndicatorConfig::default()).unwrap();

    // a source that restates the last saved day and adds one more
    struct Restating;
    impl DataSource for Restating {
        fn fetch(&self, _: &str, _: NaiveDate) -> std::result::Result<Vec<PriceBar>, FetchError> {
            Ok(vec![
                PriceBar::new(d(2024, 1, 3), 1.0, 1.0, 1.0, 1.0, 1.0),
                PriceBar::new(d(2024, 1, 4), 2.0, 2.0, 2.0, 2.0, 2.0),
            ])
        }
    }

    let updater = ArchiveUpdater::new(store, Restating);
    let outcome = updater.update_as_of("IBM", d(2024, 1, 31)).unwrap();
    assert_eq!(outcome.status, UpdateStatus::Extended { added: 1 });
    assert_eq!(outcome.bars[2], saved[2]);
    assert_eq!(outcome.bars[3].close, 2.0);
}

#[test]
fn repeated_update_is_byte_identical() {
    let tmp = tempfile::tempdir().unwrap();
    let source = MemorySource::new().with_series("SPY", bars_from(d(2024, 1, 1), 40, 400.0));
    let updater = ArchiveUpdater::new(ArchiveStore::new(tmp.path()), source);
    let today = d(2024, 3, 1);

    updater.update_as_of("SPY", today).unwrap();
    let path = updater.store().path_for("SPY");
    let first = fs::read(&path).unwrap();

    let outcome = updater.update_as_of("SPY", today).unwrap();
    assert_eq!(outcome.status, UpdateStatus::NoNewData);
    assert_eq!(fs::read(&path).unwrap(), first);

    let outcome = updater.update_as_of("SPY", d(2024, 2, 9)).unwrap();
    assert_eq!(outcome.status, UpdateStatus::UpToDate);
    assert_eq!(fs::read(&path).unwrap(), first);
}

#[test]
fn saved_archive_round_trips_through_store() {
    let tmp = tempfile::tempdir().unwrap();
    let store = ArchiveStore::new(tmp.path());
    let bars = vec![PriceBar::new(d(2024, 1, 2), 0.1 + 0.2, 1.0 / 3.0, 0.1, 0.3, 123_456_789.0)];
    store.save("ODD", &bars, &IndicatorConfig::default()).unwrap();
    assert_eq!(store.load("ODD").unwrap().unwrap(), bars);
}

#[test]
fn fetch_failure_leaves_archive_untouched() {
    let tmp = tempfile::tempdir().unwrap();
    let store = ArchiveStore::new(tmp.path());
    store
        .save("BAD", &bars_from(d(2024, 1, 1), 3, 10.0), &IndicatorConfig::default())
        .unwrap();
    let before = fs::read(store.path_for("BAD")).unwrap();

    let updater = ArchiveUpdater::new(store, MemorySource::new().failing("BAD"));
    let err = updater.update_as_of("BAD", d(2024, 2, 1)).unwrap_err();
    assert!(matches!(err, TickerError::Fetch { ref symbol, .. } if symbol == "BAD"));
    assert_eq!(fs::read(updater.store().path_for("BAD")).unwrap(), before);
}

#[test]
fn batch_isolates_failures() {
    let tmp = tempfile::tempdir().unwrap();
    let mut source = MemorySource::new().failing("DOWN");
    let symbols: Vec<String> = (0..25).map(|i| format!("S{i:02}")).collect();
    for (i, symbol) in symbols.iter().enumerate() {
        source = source.with_series(symbol.clone(), bars_from(d(2024, 1, 1), 5 + i, 20.0));
    }
    let mut requested = symbols.clone();
    requested.push("DOWN".into());
    requested.push("S00".into());

    let updater = ArchiveUpdater::new(ArchiveStore::new(tmp.path()), source);
    let report = batch_update(&updater, &requested, 4).unwrap();

    assert_eq!(report.succeeded.len(), 25);
    assert_eq!(report.total(), 26);
    assert_eq!(report.succeeded["S07"].len(), 12);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].symbol, "DOWN");
    assert!(report.failed[0].message.contains("DOWN"));
    assert!(symbols.iter().all(|s| updater.store().exists(s)));
    assert_eq!(updater.source().fetch_count(), 26);
}

#[test]
fn csv_drop_directory_feeds_the_archive() {
    let drop_dir = tempfile::tempdir().unwrap();
    let data_dir = tempfile::tempdir().unwrap();
    fs::write(
        drop_dir.path().join("QQQ.csv"),
        "Date,Open,High,Low,Close,Volume\n\
         2024-04-02,10,11,9,10.5,1000\n\
         2024-04-01,9,10,8,9.5,900\n",
    )
    .unwrap();

    let updater = ArchiveUpdater::new(
        ArchiveStore::new(data_dir.path()),
        CsvDropSource::new(drop_dir.path()),
    );
    let outcome = updater.update_as_of("QQQ", d(2024, 4, 5)).unwrap();
    assert_eq!(outcome.status, UpdateStatus::Created);
    assert_eq!(outcome.bars[0].date, d(2024, 4, 1));
    assert_eq!(outcome.bars[1].close, 10.5);
}
