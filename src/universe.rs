//! Index constituents: which symbols to archive and snapshot

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::{Result, TickerError};

/// One constituent of the tracked index. Field names follow the usual
/// constituent table headers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    #[serde(rename = "Ticker", alias = "Symbol")]
    pub ticker: String,
    #[serde(rename = "Security", default)]
    pub name: String,
    #[serde(rename = "GICS Sector", default)]
    pub sector: String,
    #[serde(rename = "GICS Sub-Industry", default)]
    pub sub_industry: String,
}

/// Exchange-style ticker to the data provider's form: `BRK.B` -> `BRK-B`
pub fn normalize_ticker(ticker: &str) -> String {
    ticker.trim().replace('.', "-")
}

/// Source of index constituents
pub trait SymbolUniverse {
    fn listings(&self) -> Result<Vec<Listing>>;

    /// Normalized tickers in listing order
    fn tickers(&self) -> Result<Vec<String>> {
        Ok(self.listings()?.into_iter().map(|l| l.ticker).collect())
    }
}

impl SymbolUniverse for Vec<Listing> {
    fn listings(&self) -> Result<Vec<Listing>> {
        Ok(self
            .iter()
            .map(|l| Listing {
                ticker: normalize_ticker(&l.ticker),
                ..l.clone()
            })
            .collect())
    }
}

/// Constituent table saved as CSV. `Symbol` is accepted for `Ticker`.
#[derive(Debug, Clone)]
pub struct CsvUniverse {
    path: PathBuf,
}

impl CsvUniverse {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SymbolUniverse for CsvUniverse {
    fn listings(&self) -> Result<Vec<Listing>> {
        let csv_error = |source| TickerError::Csv {
            path: self.path.clone(),
            source,
        };
        let mut reader = csv::Reader::from_path(&self.path).map_err(csv_error)?;

        let mut listings = Vec::new();
        for record in reader.deserialize::<Listing>() {
            let mut listing = record.map_err(csv_error)?;
            listing.ticker = normalize_ticker(&listing.ticker);
            if !listing.ticker.is_empty() {
                listings.push(listing);
            }
        }
        Ok(listings)
    }
}
