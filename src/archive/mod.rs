//! Per-symbol price archive
//!
//! Each symbol lives in `<root>/<SYMBOL>.csv`, sorted by date with no
//! duplicate dates. An update appends whatever a [`DataSource`] returns after
//! the last saved date; a symbol with no archive is fetched from
//! [`cold_start_date`]. Batch updates fan out over a bounded rayon pool and
//! isolate per-symbol failures.

use std::{fs, path::Path, thread, time::Duration};

use chrono::NaiveDate;
use tracing::warn;

use crate::{Result, TickerError};

mod source;
mod store;
mod update;

pub use source::{CsvDropSource, DataSource, MemorySource};
pub use store::{write_feature_table, ArchiveStore, PRICE_COLUMNS};
pub use update::{
    batch_update, merge_bars, ArchiveUpdater, BatchReport, SymbolFailure, UpdateOutcome,
    UpdateStatus, DEFAULT_WORKERS,
};

/// First date requested for a symbol that has no archive yet
pub fn cold_start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(1900, 1, 1).unwrap_or(NaiveDate::MIN)
}

/// Create `path` and its parents. A failed attempt is retried once after
/// `backoff`; the error surfaces only if the directory still does not exist.
pub fn ensure_dir(path: &Path, backoff: Duration) -> Result<()> {
    let Err(first) = fs::create_dir_all(path) else {
        return Ok(());
    };
    warn!(path = %path.display(), error = %first, "creating directory failed, retrying");
    thread::sleep(backoff);

    match fs::create_dir_all(path) {
        Ok(()) => Ok(()),
        Err(_) if path.is_dir() => Ok(()),
        Err(source) => Err(TickerError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_dir_creates_nested_tree() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("a").join("b");
        ensure_dir(&nested, Duration::ZERO).unwrap();
        assert!(nested.is_dir());
        // existing directory is fine
        ensure_dir(&nested, Duration::ZERO).unwrap();
    }

    #[test]
    fn ensure_dir_reports_blocked_path() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("plain");
        fs::write(&file, b"x").unwrap();
        let err = ensure_dir(&file.join("sub"), Duration::from_millis(1)).unwrap_err();
        assert!(matches!(err, TickerError::Io { .. }));
    }
}
