//! # tickers - daily equity features and pattern signals
//!
//! Computes technical-analysis features over daily OHLCV series and keeps a
//! local per-symbol archive up to date.
//!
//! The feature pipeline runs in three stages:
//!
//! 1. [`indicators`] - SMA/EMA over the configured windows, RSI, MACD
//! 2. [`volume`] - calendar-aware, weekday-normalized volume z-score
//! 3. [`detectors`] - candlestick patterns gated on high-volume days
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::{Duration, NaiveDate};
//! use tickers::prelude::*;
//!
//! let start = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
//! let bars: Vec<PriceBar> = (0..30)
//!     .map(|i| {
//!         let c = 100.0 + i as f64;
//!         PriceBar::new(start + Duration::days(i), c - 0.5, c + 1.0, c - 1.0, c, 1_000.0)
//!     })
//!     .collect();
//!
//! let pipeline = PipelineBuilder::new().with_all_defaults().build().unwrap();
//! let rows = pipeline.compute(&bars).unwrap();
//! assert_eq!(rows.len(), bars.len());
//! ```

use std::path::PathBuf;

use chrono::NaiveDate;

pub mod archive;
pub mod calendar;
pub mod config;
pub mod detectors;
pub mod indicators;
pub mod metadata;
pub mod rolling;
pub mod universe;
pub mod volume;

pub mod prelude {
    pub use crate::{
        // Archive
        archive::{
            batch_update, merge_bars, ArchiveStore, ArchiveUpdater, BatchReport, CsvDropSource,
            DataSource, MemorySource, SymbolFailure, UpdateOutcome, UpdateStatus,
        },
        // Parallel
        compute_parallel,
        config::Config,
        // Detectors
        detectors::*,
        indicators::{IndicatorConfig, MacdPoint},
        volume::VolumeConfig,
        // Core traits
        BuiltinDetector,
        // Errors
        FeatureError,
        FeaturePipeline,
        FeatureRow,
        FeatureSet,
        FetchError,
        OHLCVExt,
        PatternDetector,
        PatternId,
        PatternSignals,
        Period,
        PipelineBuilder,
        PipelineConfig,
        PriceBar,
        Ratio,
        Result,
        TickerError,
        OHLCV,
    };
}

// ============================================================
// ERRORS
// ============================================================

pub type Result<T> = std::result::Result<T, TickerError>;

/// Errors raised by the pipeline, the archive and the collaborators
#[derive(Debug, thiserror::Error)]
pub enum TickerError {
    #[error("Invalid value: {0}")]
    InvalidValue(&'static str),

    #[error("{field} = {value} out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Invalid bar at index {index}: {reason}")]
    InvalidBar { index: usize, reason: &'static str },

    #[error("Bar at index {index} has no date")]
    MissingDate { index: usize },

    #[error("Series is not sorted by date at index {index}")]
    Unsorted { index: usize },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("CSV error in {}: {source}", path.display())]
    Csv { path: PathBuf, source: csv::Error },

    #[error("Fetch failed for {symbol}: {source}")]
    Fetch { symbol: String, source: FetchError },
}

/// Errors reported by remote collaborators (price data, metadata)
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("source unavailable: {0}")]
    Unavailable(String),

    #[error("malformed data: {0}")]
    Malformed(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ============================================================
// VALIDATED TYPES
// ============================================================

/// Normalized value in range 0.0..=1.0
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Ratio(f64);

impl Ratio {
    /// Create a new Ratio, validating the value is in [0.0, 1.0]
    pub fn new(value: f64) -> Result<Self> {
        if value.is_nan() || value.is_infinite() {
            return Err(TickerError::InvalidValue("Ratio cannot be NaN or infinite"));
        }
        if !(0.0..=1.0).contains(&value) {
            return Err(TickerError::OutOfRange {
                field: "Ratio",
                value,
                min: 0.0,
                max: 1.0,
            });
        }
        Ok(Self(value))
    }

    /// Create a Ratio from a compile-time constant (library internal use)
    #[doc(hidden)]
    pub const fn new_const(value: f64) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> f64 {
        self.0
    }
}

impl serde::Serialize for Ratio {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Ratio {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = f64::deserialize(d)?;
        Ratio::new(value).map_err(serde::de::Error::custom)
    }
}

/// Window length in bars (must be > 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period(usize);

impl Period {
    /// Create a new Period, validating value is > 0
    pub fn new(value: usize) -> Result<Self> {
        if value == 0 {
            return Err(TickerError::InvalidValue("Period must be > 0"));
        }
        Ok(Self(value))
    }

    #[doc(hidden)]
    pub const fn new_const(value: usize) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl serde::Serialize for Period {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Period {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = usize::deserialize(d)?;
        Period::new(value).map_err(serde::de::Error::custom)
    }
}

// ============================================================
// OHLCV TRAITS
// ============================================================

/// Core OHLCV data trait
pub trait OHLCV {
    fn open(&self) -> f64;
    fn high(&self) -> f64;
    fn low(&self) -> f64;
    fn close(&self) -> f64;
    fn volume(&self) -> f64;

    /// Trading date, when the bar carries one. The volume normalizer needs it.
    fn date(&self) -> Option<NaiveDate> {
        None
    }
}

/// Extension trait with computed properties for OHLCV data
pub trait OHLCVExt: OHLCV {
    #[inline]
    fn body(&self) -> f64 {
        (self.close() - self.open()).abs()
    }

    #[inline]
    fn range(&self) -> f64 {
        self.high() - self.low()
    }

    #[inline]
    fn upper_shadow(&self) -> f64 {
        self.high() - self.open().max(self.close())
    }

    #[inline]
    fn lower_shadow(&self) -> f64 {
        self.open().min(self.close()) - self.low()
    }

    #[inline]
    fn is_bullish(&self) -> bool {
        self.close() > self.open()
    }

    #[inline]
    fn is_bearish(&self) -> bool {
        self.close() < self.open()
    }

    /// Validate OHLCV data consistency
    fn validate(&self) -> Result<()> {
        if self.open().is_nan()
            || self.high().is_nan()
            || self.low().is_nan()
            || self.close().is_nan()
            || self.volume().is_nan()
        {
            return Err(TickerError::InvalidBar {
                index: 0,
                reason: "NaN in OHLCV",
            });
        }
        if self.open().is_infinite()
            || self.high().is_infinite()
            || self.low().is_infinite()
            || self.close().is_infinite()
            || self.volume().is_infinite()
        {
            return Err(TickerError::InvalidBar {
                index: 0,
                reason: "Infinite value in OHLCV",
            });
        }
        if self.high() < self.low() {
            return Err(TickerError::InvalidBar {
                index: 0,
                reason: "high < low",
            });
        }
        if self.volume() < 0.0 {
            return Err(TickerError::InvalidBar {
                index: 0,
                reason: "negative volume",
            });
        }
        Ok(())
    }
}

impl<T: OHLCV> OHLCVExt for T {}

/// One trading day of a symbol. Column names match the archive header.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PriceBar {
    #[serde(rename = "Date")]
    pub date: NaiveDate,
    #[serde(rename = "Open")]
    pub open: f64,
    #[serde(rename = "High")]
    pub high: f64,
    #[serde(rename = "Low")]
    pub low: f64,
    #[serde(rename = "Close")]
    pub close: f64,
    #[serde(rename = "Volume")]
    pub volume: f64,
}

impl PriceBar {
    pub fn new(date: NaiveDate, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
            volume,
        }
    }
}

impl OHLCV for PriceBar {
    fn open(&self) -> f64 {
        self.open
    }

    fn high(&self) -> f64 {
        self.high
    }

    fn low(&self) -> f64 {
        self.low
    }

    fn close(&self) -> f64 {
        self.close
    }

    fn volume(&self) -> f64 {
        self.volume
    }

    fn date(&self) -> Option<NaiveDate> {
        Some(self.date)
    }
}

// ============================================================
// PATTERN IDS
// ============================================================

/// Unique identifier for a pattern type; doubles as the output column name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PatternId(pub &'static str);

impl PatternId {
    /// Returns the string identifier
    #[inline]
    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl std::fmt::Display for PatternId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0)
    }
}

// ============================================================
// FEATURE ROWS
// ============================================================

/// Pattern booleans for one row. Every pattern flag implies `high_volume`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct PatternSignals {
    pub high_volume: bool,
    pub hammer: bool,
    pub bullish_engulfing: bool,
    pub bearish_engulfing: bool,
    pub morning_star: bool,
    pub shooting_star: bool,
}

impl PatternSignals {
    /// Flag for a pattern id; unknown ids read as `false`
    pub fn get(&self, id: PatternId) -> bool {
        match id.as_str() {
            "hammer" => self.hammer,
            "bullish_engulfing" => self.bullish_engulfing,
            "bearish_engulfing" => self.bearish_engulfing,
            "morning_star" => self.morning_star,
            "shooting_star" => self.shooting_star,
            _ => false,
        }
    }

    fn set(&mut self, id: PatternId, value: bool) {
        match id.as_str() {
            "hammer" => self.hammer = value,
            "bullish_engulfing" => self.bullish_engulfing = value,
            "bearish_engulfing" => self.bearish_engulfing = value,
            "morning_star" => self.morning_star = value,
            "shooting_star" => self.shooting_star = value,
            _ => {}
        }
    }

    /// Patterns present on this row, in [`detectors::ALL_PATTERNS`] order
    pub fn fired(&self) -> Vec<PatternId> {
        detectors::ALL_PATTERNS
            .iter()
            .copied()
            .filter(|id| self.get(*id))
            .collect()
    }

    pub fn any(&self) -> bool {
        detectors::ALL_PATTERNS.iter().any(|id| self.get(*id))
    }
}

/// A price bar plus every derived column.
///
/// `sma` and `ema` hold one value per configured moving-average window, in
/// the order of [`IndicatorConfig::ma_windows`](indicators::IndicatorConfig).
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub bar: PriceBar,
    pub ema: Vec<f64>,
    pub sma: Vec<Option<f64>>,
    pub rsi: Option<f64>,
    pub macd: indicators::MacdPoint,
    pub normalized_volume: Option<f64>,
    pub signals: PatternSignals,
}

// ============================================================
// PATTERN DETECTOR TRAIT
// ============================================================

/// Candlestick detector. `matches_at` is the pure shape test; `detect`
/// combines it with the high-volume gate.
pub trait PatternDetector: Send + Sync {
    fn id(&self) -> PatternId;
    fn min_bars(&self) -> usize;

    /// Shape test at `index`, ignoring volume
    fn matches_at<T: OHLCV>(&self, bars: &[T], index: usize) -> bool;

    fn validate_config(&self) -> Result<()> {
        Ok(())
    }

    /// One flag per bar. Rows where `gate` is false (or missing) are never set.
    fn detect<T: OHLCV>(&self, bars: &[T], gate: &[bool]) -> Vec<bool> {
        (0..bars.len())
            .map(|i| {
                gate.get(i).copied().unwrap_or(false)
                    && i + 1 >= self.min_bars()
                    && self.matches_at(bars, i)
            })
            .collect()
    }
}

// ============================================================
// BUILTIN DETECTORS - generated via macro
// ============================================================

use detectors::*;

/// Macro to generate BuiltinDetector enum without boilerplate
macro_rules! define_builtin_detectors {
    (
        $(
            $variant:ident($detector:ty)
        ),* $(,)?
    ) => {
        /// All builtin detectors - enum dispatch
        #[derive(Debug, Clone)]
        pub enum BuiltinDetector {
            $($variant($detector)),*
        }

        impl BuiltinDetector {
            #[inline]
            pub fn detect<T: OHLCV>(&self, bars: &[T], gate: &[bool]) -> Vec<bool> {
                match self {
                    $(Self::$variant(d) => PatternDetector::detect(d, bars, gate)),*
                }
            }

            #[inline]
            pub fn matches_at<T: OHLCV>(&self, bars: &[T], index: usize) -> bool {
                match self {
                    $(Self::$variant(d) => PatternDetector::matches_at(d, bars, index)),*
                }
            }

            #[inline]
            pub fn id(&self) -> PatternId {
                match self {
                    $(Self::$variant(d) => PatternDetector::id(d)),*
                }
            }

            #[inline]
            pub fn min_bars(&self) -> usize {
                match self {
                    $(Self::$variant(d) => PatternDetector::min_bars(d)),*
                }
            }

            pub fn validate_config(&self) -> Result<()> {
                match self {
                    $(Self::$variant(d) => PatternDetector::validate_config(d)),*
                }
            }
        }
    };
}

define_builtin_detectors! {
    Hammer(HammerDetector),
    ShootingStar(ShootingStarDetector),
    BullishEngulfing(BullishEngulfingDetector),
    BearishEngulfing(BearishEngulfingDetector),
    MorningStar(MorningStarDetector),
}

// ============================================================
// FEATURE PIPELINE
// ============================================================

/// Pipeline configuration
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub indicators: indicators::IndicatorConfig,
    pub volume: volume::VolumeConfig,
    pub gate: HighVolumeGate,
    pub validate_data: bool,
}

/// Raw bars in, feature rows out
pub struct FeaturePipeline {
    detectors: Vec<BuiltinDetector>,
    config: PipelineConfig,
}

impl FeaturePipeline {
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn detectors(&self) -> &[BuiltinDetector] {
        &self.detectors
    }

    /// Compute every feature column for a date-sorted series.
    pub fn compute(&self, bars: &[PriceBar]) -> Result<Vec<FeatureRow>> {
        if self.config.validate_data {
            self.validate_bars(bars)?;
        }

        let ind = indicators::compute_indicators(bars, &self.config.indicators);
        let normalized = volume::normalize_volume(bars, &self.config.volume)?;
        let signals = self.signals(bars);

        let rows = bars
            .iter()
            .enumerate()
            .map(|(i, bar)| FeatureRow {
                bar: *bar,
                ema: ind.ema.iter().map(|col| col[i]).collect(),
                sma: ind.sma.iter().map(|col| col[i]).collect(),
                rsi: ind.rsi[i],
                macd: ind.macd[i],
                normalized_volume: normalized[i],
                signals: signals[i],
            })
            .collect();

        Ok(rows)
    }

    /// Gate and pattern flags only, without indicators or volume normalization.
    pub fn signals<T: OHLCV>(&self, bars: &[T]) -> Vec<PatternSignals> {
        let gate = self.config.gate.evaluate(bars);
        let mut signals: Vec<PatternSignals> = gate
            .iter()
            .map(|&high_volume| PatternSignals {
                high_volume,
                ..PatternSignals::default()
            })
            .collect();

        for detector in &self.detectors {
            let id = detector.id();
            for (row, hit) in signals.iter_mut().zip(detector.detect(bars, &gate)) {
                if hit {
                    row.set(id, true);
                }
            }
        }

        signals
    }

    fn validate_bars<T: OHLCV>(&self, bars: &[T]) -> Result<()> {
        for (i, bar) in bars.iter().enumerate() {
            bar.validate().map_err(|e| match e {
                TickerError::InvalidBar { reason, .. } => TickerError::InvalidBar { index: i, reason },
                other => other,
            })?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        self.config.indicators.validate()?;
        self.config.volume.validate()?;
        self.config.gate.validate()?;
        for d in &self.detectors {
            d.validate_config()?;
        }
        Ok(())
    }
}

// ============================================================
// BUILDER
// ============================================================

/// Builder for creating FeaturePipeline instances
pub struct PipelineBuilder {
    detectors: Vec<BuiltinDetector>,
    config: PipelineConfig,
    pattern_filter: Option<Vec<PatternId>>,
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self::from_config(PipelineConfig::default())
    }

    pub fn from_config(config: PipelineConfig) -> Self {
        Self {
            detectors: Vec::new(),
            config,
            pattern_filter: None,
        }
    }

    /// Add the five builtin detectors with default thresholds
    pub fn with_all_defaults(mut self) -> Self {
        self.detectors.extend([
            BuiltinDetector::Hammer(HammerDetector::default()),
            BuiltinDetector::ShootingStar(ShootingStarDetector::default()),
            BuiltinDetector::BullishEngulfing(BullishEngulfingDetector),
            BuiltinDetector::BearishEngulfing(BearishEngulfingDetector),
            BuiltinDetector::MorningStar(MorningStarDetector::default()),
        ]);
        self
    }

    /// Add a builtin detector
    #[allow(clippy::should_implement_trait)]
    pub fn add(mut self, detector: BuiltinDetector) -> Self {
        self.detectors.push(detector);
        self
    }

    /// Add with config validation
    pub fn add_checked(mut self, detector: BuiltinDetector) -> Result<Self> {
        detector.validate_config()?;
        self.detectors.push(detector);
        Ok(self)
    }

    pub fn indicators(mut self, indicators: indicators::IndicatorConfig) -> Self {
        self.config.indicators = indicators;
        self
    }

    pub fn volume(mut self, volume: volume::VolumeConfig) -> Self {
        self.config.volume = volume;
        self
    }

    pub fn gate(mut self, gate: HighVolumeGate) -> Self {
        self.config.gate = gate;
        self
    }

    /// Enable/disable data validation
    pub fn validate_data(mut self, enable: bool) -> Self {
        self.config.validate_data = enable;
        self
    }

    /// Keep only the listed patterns
    pub fn only_patterns(mut self, ids: impl IntoIterator<Item = PatternId>) -> Self {
        self.pattern_filter = Some(ids.into_iter().collect());
        self
    }

    /// Build the pipeline
    pub fn build(self) -> Result<FeaturePipeline> {
        let mut detectors = self.detectors;
        if let Some(filter) = &self.pattern_filter {
            detectors.retain(|d| filter.contains(&d.id()));
        }

        let pipeline = FeaturePipeline {
            detectors,
            config: self.config,
        };
        pipeline.validate()?;
        Ok(pipeline)
    }
}

// ============================================================
// PARALLEL COMPUTATION
// ============================================================

use rayon::prelude::*;

/// Features of a single instrument
#[derive(Debug)]
pub struct FeatureSet {
    pub symbol: String,
    pub rows: Vec<FeatureRow>,
}

/// Error from computing a single instrument
#[derive(Debug)]
pub struct FeatureError {
    pub symbol: String,
    pub error: TickerError,
}

/// Compute features for many instruments on the rayon global pool
pub fn compute_parallel<'a, I>(
    pipeline: &FeaturePipeline,
    instruments: I,
) -> (Vec<FeatureSet>, Vec<FeatureError>)
where
    I: IntoParallelIterator<Item = (&'a str, &'a [PriceBar])>,
{
    let results: Vec<_> = instruments
        .into_par_iter()
        .map(|(symbol, bars)| {
            pipeline
                .compute(bars)
                .map(|rows| FeatureSet {
                    symbol: symbol.to_string(),
                    rows,
                })
                .map_err(|error| FeatureError {
                    symbol: symbol.to_string(),
                    error,
                })
        })
        .collect();

    let mut successes = Vec::new();
    let mut errors = Vec::new();

    for result in results {
        match result {
            Ok(r) => successes.push(r),
            Err(e) => errors.push(e),
        }
    }

    (successes, errors)
}

// ============================================================
// TESTS
// ============================================================
