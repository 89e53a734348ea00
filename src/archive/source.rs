use std::{
    collections::{HashMap, HashSet},
    fs::File,
    io,
    path::PathBuf,
    sync::atomic::{AtomicUsize, Ordering},
};

use chrono::NaiveDate;

use crate::{FetchError, PriceBar};

/// Remote daily price data
pub trait DataSource: Send + Sync {
    /// Bars dated on or after `start`. An empty vec means no new data.
    fn fetch(&self, symbol: &str, start: NaiveDate) -> Result<Vec<PriceBar>, FetchError>;
}

impl<S: DataSource + ?Sized> DataSource for &S {
    fn fetch(&self, symbol: &str, start: NaiveDate) -> Result<Vec<PriceBar>, FetchError> {
        (**self).fetch(symbol, start)
    }
}

impl<S: DataSource + ?Sized> DataSource for Box<S> {
    fn fetch(&self, symbol: &str, start: NaiveDate) -> Result<Vec<PriceBar>, FetchError> {
        (**self).fetch(symbol, start)
    }
}

// ============================================================
// IN-MEMORY SOURCE
// ============================================================

/// Fixed series per symbol, optionally failing for some symbols
#[derive(Debug, Default)]
pub struct MemorySource {
    series: HashMap<String, Vec<PriceBar>>,
    failing: HashSet<String>,
    calls: AtomicUsize,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_series(mut self, symbol: impl Into<String>, bars: Vec<PriceBar>) -> Self {
        self.series.insert(symbol.into(), bars);
        self
    }

    /// Every fetch of `symbol` fails with [`FetchError::Unavailable`]
    pub fn failing(mut self, symbol: impl Into<String>) -> Self {
        self.failing.insert(symbol.into());
        self
    }

    /// Number of fetches served so far, failed ones included
    pub fn fetch_count(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

impl DataSource for MemorySource {
    fn fetch(&self, symbol: &str, start: NaiveDate) -> Result<Vec<PriceBar>, FetchError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if self.failing.contains(symbol) {
            return Err(FetchError::Unavailable(format!("{symbol} is not served")));
        }
        Ok(self
            .series
            .get(symbol)
            .map(|bars| bars.iter().filter(|b| b.date >= start).copied().collect())
            .unwrap_or_default())
    }
}

// ============================================================
// CSV DROP DIRECTORY
// ============================================================

/// Reads `<dir>/<SYMBOL>.csv` files with the archive's price columns, as
/// dropped by an external downloader. A missing file is no data.
#[derive(Debug, Clone)]
pub struct CsvDropSource {
    dir: PathBuf,
}

impl CsvDropSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl DataSource for CsvDropSource {
    fn fetch(&self, symbol: &str, start: NaiveDate) -> Result<Vec<PriceBar>, FetchError> {
        let path = self.dir.join(format!("{symbol}.csv"));
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut bars = Vec::new();
        for record in csv::Reader::from_reader(file).deserialize::<PriceBar>() {
            let bar = record.map_err(|e| FetchError::Malformed(format!("{}: {e}", path.display())))?;
            if bar.date >= start {
                bars.push(bar);
            }
        }
        Ok(bars)
    }
}
