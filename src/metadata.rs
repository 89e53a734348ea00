//! Company metadata snapshot
//!
//! Fetches descriptive fields for every symbol in parallel and writes one
//! dated CSV per run. A failed lookup still produces a row carrying the
//! error text.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    time::Duration,
};

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{archive::ensure_dir, FetchError, Result, TickerError};

/// Snapshot column order
pub const SNAPSHOT_COLUMNS: [&str; 7] = [
    "Ticker",
    "Name",
    "Market Cap",
    "Sector",
    "Industry",
    "Full Time Employees",
    "Error",
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyMetadata {
    #[serde(rename = "Ticker")]
    pub ticker: String,
    #[serde(rename = "Name")]
    pub name: Option<String>,
    #[serde(rename = "Market Cap")]
    pub market_cap: Option<u64>,
    #[serde(rename = "Sector")]
    pub sector: Option<String>,
    #[serde(rename = "Industry")]
    pub industry: Option<String>,
    #[serde(rename = "Full Time Employees")]
    pub full_time_employees: Option<u64>,
    #[serde(rename = "Error")]
    pub error: Option<String>,
}

impl CompanyMetadata {
    /// Row for a symbol whose lookup failed
    pub fn failed(ticker: impl Into<String>, error: impl ToString) -> Self {
        Self {
            ticker: ticker.into(),
            error: Some(error.to_string()),
            ..Self::default()
        }
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}

/// Remote company information lookup
pub trait MetadataSource: Send + Sync {
    fn company(&self, ticker: &str) -> std::result::Result<CompanyMetadata, FetchError>;
}

// ============================================================
// JSON SOURCE
// ============================================================

/// Provider-style quote summary; unknown keys are ignored. Counts may arrive
/// as floats (`3.0e12`), so they are read as `f64` and checked per ticker.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteInfo {
    short_name: Option<String>,
    market_cap: Option<f64>,
    sector: Option<String>,
    industry: Option<String>,
    full_time_employees: Option<f64>,
}

fn count_field(ticker: &str, field: &str, value: Option<f64>) -> std::result::Result<Option<u64>, FetchError> {
    match value {
        None => Ok(None),
        Some(v) if v.is_finite() && v >= 0.0 => Ok(Some(v.round() as u64)),
        Some(v) => Err(FetchError::Malformed(format!("{ticker}: {field} = {v}"))),
    }
}

/// Metadata from a JSON object keyed by ticker, each value shaped like a
/// quote summary (`shortName`, `marketCap`, `sector`, `industry`,
/// `fullTimeEmployees`). Entries are decoded on lookup, so one bad entry
/// fails only its own ticker.
#[derive(Debug, Clone)]
pub struct JsonMetadataSource {
    entries: HashMap<String, serde_json::Value>,
}

impl JsonMetadataSource {
    pub fn from_json(text: &str) -> std::result::Result<Self, FetchError> {
        let entries =
            serde_json::from_str(text).map_err(|e| FetchError::Malformed(e.to_string()))?;
        Ok(Self { entries })
    }

    pub fn from_path(path: &Path) -> std::result::Result<Self, FetchError> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }
}

impl MetadataSource for JsonMetadataSource {
    fn company(&self, ticker: &str) -> std::result::Result<CompanyMetadata, FetchError> {
        let value = self
            .entries
            .get(ticker)
            .ok_or_else(|| FetchError::Unavailable(format!("no metadata for {ticker}")))?;
        let info = QuoteInfo::deserialize(value)
            .map_err(|e| FetchError::Malformed(format!("{ticker}: {e}")))?;
        Ok(CompanyMetadata {
            ticker: ticker.to_string(),
            market_cap: count_field(ticker, "marketCap", info.market_cap)?,
            full_time_employees: count_field(ticker, "fullTimeEmployees", info.full_time_employees)?,
            name: info.short_name,
            sector: info.sector,
            industry: info.industry,
            error: None,
        })
    }
}

// ============================================================
// SNAPSHOT
// ============================================================

/// One row per unique ticker, sorted by ticker, fetched on `workers` threads
pub fn snapshot_metadata<M, T>(source: &M, tickers: &[T], workers: usize) -> Result<Vec<CompanyMetadata>>
where
    M: MetadataSource,
    T: AsRef<str> + Sync,
{
    if workers == 0 {
        return Err(TickerError::InvalidValue("workers must be > 0"));
    }
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .map_err(|e| TickerError::InvalidConfig(format!("worker pool: {e}")))?;

    let mut rows: Vec<CompanyMetadata> = pool.install(|| {
        tickers
            .par_iter()
            .map(|ticker| {
                let ticker = ticker.as_ref();
                source.company(ticker).unwrap_or_else(|e| {
                    warn!(ticker, error = %e, "metadata lookup failed");
                    CompanyMetadata::failed(ticker, e)
                })
            })
            .collect()
    });

    rows.sort_by(|a, b| a.ticker.cmp(&b.ticker));
    rows.dedup_by(|a, b| a.ticker == b.ticker);
    info!(
        rows = rows.len(),
        failed = rows.iter().filter(|r| r.is_failed()).count(),
        "metadata snapshot fetched"
    );
    Ok(rows)
}

/// Snapshot file name for `date`
pub fn snapshot_file_name(date: NaiveDate) -> String {
    format!("sp500_metadata_{}.csv", date.format("%Y-%m-%d"))
}

/// Write `rows` to `<outdir>/sp500_metadata_<date>.csv`, creating `outdir`
pub fn write_snapshot(
    rows: &[CompanyMetadata],
    outdir: &Path,
    date: NaiveDate,
    backoff: Duration,
) -> Result<PathBuf> {
    ensure_dir(outdir, backoff)?;
    let path = outdir.join(snapshot_file_name(date));
    let csv_error = |source| TickerError::Csv {
        path: path.clone(),
        source,
    };

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(&path)
        .map_err(csv_error)?;
    writer.write_record(SNAPSHOT_COLUMNS).map_err(csv_error)?;
    for row in rows {
        writer.serialize(row).map_err(csv_error)?;
    }
    writer.flush().map_err(|source| TickerError::Io {
        path: path.clone(),
        source,
    })?;

    info!(path = %path.display(), rows = rows.len(), "metadata snapshot written");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    const JSON: &str = r#"{
        "AAPL": {"shortName": "Apple Inc.", "marketCap": 3000000000000,
                 "sector": "Technology", "industry": "Consumer Electronics",
                 "fullTimeEmployees": 161000, "currency": "USD"},
        "BRK-B": {"shortName": "Berkshire Hathaway Inc.", "sector": "Financial Services"}
    }"#;

    #[test]
    fn json_source_lookup() {
        let source = JsonMetadataSource::from_json(JSON).unwrap();
        let apple = source.company("AAPL").unwrap();
        assert_eq!(apple.name.as_deref(), Some("Apple Inc."));
        assert_eq!(apple.full_time_employees, Some(161_000));

        let brk = source.company("BRK-B").unwrap();
        assert_eq!(brk.market_cap, None);
        assert!(matches!(source.company("ZZZ"), Err(FetchError::Unavailable(_))));
    }

    #[test]
    fn malformed_json() {
        assert!(matches!(
            JsonMetadataSource::from_json("[1, 2]"),
            Err(FetchError::Malformed(_))
        ));
    }

    #[test]
    fn bad_entry_fails_only_its_ticker() {
        let source = JsonMetadataSource::from_json(
            r#"{"AAPL": {"marketCap": 3.0e12},
                "MSFT": {"marketCap": 100},
                "NEG": {"fullTimeEmployees": -5},
                "ODD": {"sector": 7}}"#,
        )
        .unwrap();

        assert_eq!(source.company("AAPL").unwrap().market_cap, Some(3_000_000_000_000));
        assert_eq!(source.company("MSFT").unwrap().market_cap, Some(100));
        assert!(matches!(source.company("NEG"), Err(FetchError::Malformed(_))));
        assert!(matches!(source.company("ODD"), Err(FetchError::Malformed(_))));

        let rows = snapshot_metadata(&source, &["NEG", "MSFT", "ODD", "AAPL"], 2).unwrap();
        assert_eq!(rows.len(), 4);
        let failed: Vec<_> = rows.iter().filter(|r| r.is_failed()).map(|r| r.ticker.as_str()).collect();
        assert_eq!(failed, vec!["NEG", "ODD"]);
        assert_eq!(rows[1].market_cap, Some(100));
    }

    #[test]
    fn snapshot_keeps_failures_and_sorts() {
        let source = JsonMetadataSource::from_json(JSON).unwrap();
        let rows = snapshot_metadata(&source, &["ZZZ", "AAPL", "BRK-B", "AAPL"], 3).unwrap();

        let tickers: Vec<_> = rows.iter().map(|r| r.ticker.as_str()).collect();
        assert_eq!(tickers, vec!["AAPL", "BRK-B", "ZZZ"]);
        assert!(rows[2].is_failed());
        assert!(rows[2].name.is_none());
    }

    #[test]
    fn snapshot_file_layout() {
        let tmp = tempfile::tempdir().unwrap();
        let outdir = tmp.path().join("meta");
        let date = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap();
        let rows = vec![
            CompanyMetadata {
                ticker: "AAPL".into(),
                name: Some("Apple Inc.".into()),
                market_cap: Some(42),
                ..CompanyMetadata::default()
            },
            CompanyMetadata::failed("ZZZ", "timeout"),
        ];

        let path = write_snapshot(&rows, &outdir, date, Duration::ZERO).unwrap();
        assert_eq!(path, outdir.join("sp500_metadata_2024-07-01.csv"));
        let text = std::fs::read_to_string(path).unwrap();
        assert_eq!(
            text,
            "Ticker,Name,Market Cap,Sector,Industry,Full Time Employees,Error\n\
             AAPL,Apple Inc.,42,,,,\n\
             ZZZ,,,,,,timeout\n"
        );
    }
}
