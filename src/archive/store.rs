use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use chrono::NaiveDate;

use super::ensure_dir;
use crate::{
    detectors::ALL_PATTERNS,
    indicators::{self, IndicatorConfig},
    FeatureRow, PriceBar, Result, TickerError,
};

/// Leading archive columns; indicator columns follow
pub const PRICE_COLUMNS: [&str; 6] = ["Date", "Open", "High", "Low", "Close", "Volume"];

/// Directory of per-symbol CSV files
#[derive(Debug, Clone)]
pub struct ArchiveStore {
    root: PathBuf,
}

impl ArchiveStore {
    /// Store rooted at `root`. The directory is not created.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Store rooted at `root`, creating the directory tree first
    pub fn open(root: impl Into<PathBuf>, backoff: Duration) -> Result<Self> {
        let store = Self::new(root);
        ensure_dir(&store.root, backoff)?;
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, symbol: &str) -> PathBuf {
        self.root.join(format!("{symbol}.csv"))
    }

    pub fn exists(&self, symbol: &str) -> bool {
        self.path_for(symbol).is_file()
    }

    /// Saved bars for `symbol`, or `None` without an archive file.
    /// Indicator columns are ignored.
    pub fn load(&self, symbol: &str) -> Result<Option<Vec<PriceBar>>> {
        let path = self.path_for(symbol);
        if !path.is_file() {
            return Ok(None);
        }

        let mut reader = csv::Reader::from_path(&path).map_err(|e| csv_error(&path, e))?;
        let bars = reader
            .deserialize::<PriceBar>()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| csv_error(&path, e))?;
        Ok(Some(bars))
    }

    /// Most recent saved date, `None` when there is no archive or it is empty
    pub fn last_saved_date(&self, symbol: &str) -> Result<Option<NaiveDate>> {
        Ok(self
            .load(symbol)?
            .and_then(|bars| bars.iter().map(|b| b.date).max()))
    }

    /// Replace the archive of `symbol` with `bars` plus indicator columns
    /// computed over the whole series. The file is written beside the target
    /// and renamed into place.
    pub fn save(&self, symbol: &str, bars: &[PriceBar], config: &IndicatorConfig) -> Result<PathBuf> {
        let path = self.path_for(symbol);
        let tmp = self.root.join(format!(".{symbol}.csv.tmp"));

        let ind = indicators::compute_indicators(bars, config);
        let mut header: Vec<String> = PRICE_COLUMNS.iter().map(|c| c.to_string()).collect();
        header.extend(indicators::column_names(config));

        let written = write_archive(&tmp, &header, bars, &ind).and_then(|()| {
            fs::rename(&tmp, &path).map_err(|source| TickerError::Io {
                path: path.clone(),
                source,
            })
        });
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }
        Ok(path)
    }
}

fn write_archive(
    tmp: &Path,
    header: &[String],
    bars: &[PriceBar],
    ind: &indicators::IndicatorSet,
) -> Result<()> {
    let mut writer = csv::Writer::from_path(tmp).map_err(|e| csv_error(tmp, e))?;
    writer.write_record(header).map_err(|e| csv_error(tmp, e))?;
    for (i, bar) in bars.iter().enumerate() {
        let mut record = price_fields(bar);
        record.extend(ind.row_fields(i).into_iter().map(format_opt));
        writer.write_record(&record).map_err(|e| csv_error(tmp, e))?;
    }
    writer.flush().map_err(|source| TickerError::Io {
        path: tmp.to_path_buf(),
        source,
    })
}

/// Write feature rows as CSV: price columns, indicator columns, the
/// normalized volume, then one `true`/`false` column per gate and pattern.
pub fn write_feature_table(path: &Path, rows: &[FeatureRow], config: &IndicatorConfig) -> Result<()> {
    let mut header: Vec<String> = PRICE_COLUMNS.iter().map(|c| c.to_string()).collect();
    header.extend(indicators::column_names(config));
    header.push("normalized_volume".into());
    header.push("high_volume".into());
    header.extend(ALL_PATTERNS.iter().map(|id| id.to_string()));

    let mut writer = csv::Writer::from_path(path).map_err(|e| csv_error(path, e))?;
    writer.write_record(&header).map_err(|e| csv_error(path, e))?;
    for row in rows {
        let mut record = price_fields(&row.bar);
        record.extend(row.ema.iter().map(|v| v.to_string()));
        record.extend(row.sma.iter().copied().map(format_opt));
        record.push(format_opt(row.rsi));
        record.extend([row.macd.line, row.macd.signal, row.macd.histogram].map(|v| v.to_string()));
        record.push(format_opt(row.normalized_volume));
        record.push(row.signals.high_volume.to_string());
        record.extend(ALL_PATTERNS.iter().map(|id| row.signals.get(*id).to_string()));
        writer.write_record(&record).map_err(|e| csv_error(path, e))?;
    }
    writer.flush().map_err(|source| TickerError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn price_fields(bar: &PriceBar) -> Vec<String> {
    vec![
        bar.date.format("%Y-%m-%d").to_string(),
        bar.open.to_string(),
        bar.high.to_string(),
        bar.low.to_string(),
        bar.close.to_string(),
        bar.volume.to_string(),
    ]
}

/// Shortest round-trip float text; missing values become empty fields
fn format_opt(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn csv_error(path: &Path, source: csv::Error) -> TickerError {
    TickerError::Csv {
        path: path.to_path_buf(),
        source,
    }
}
