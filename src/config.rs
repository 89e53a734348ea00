//! Runtime configuration loaded from TOML
//!
//! Every field has a default so a partial file (or none at all) is valid:
//!
//! ```toml
//! data_dir = "data"
//! workers = 10
//!
//! [indicators]
//! ma_windows = [20, 50, 100, 200]
//!
//! [volume]
//! long_window = 252
//! clip = 5.0
//!
//! [gate]
//! window = 100
//! z_threshold = 1.5
//! ```

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::{
    archive::DEFAULT_WORKERS, detectors::HighVolumeGate, indicators::IndicatorConfig,
    volume::VolumeConfig, PipelineConfig, Result, TickerError,
};

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_workers() -> usize {
    DEFAULT_WORKERS
}

fn default_dir_retry_backoff_ms() -> u64 {
    5_000
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding one CSV archive per symbol
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Worker threads for batch updates and metadata snapshots
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Pause before retrying a failed directory creation
    #[serde(default = "default_dir_retry_backoff_ms")]
    pub dir_retry_backoff_ms: u64,
    #[serde(default)]
    pub indicators: IndicatorConfig,
    #[serde(default)]
    pub volume: VolumeConfig,
    #[serde(default)]
    pub gate: HighVolumeGate,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            workers: default_workers(),
            dir_retry_backoff_ms: default_dir_retry_backoff_ms(),
            indicators: IndicatorConfig::default(),
            volume: VolumeConfig::default(),
            gate: HighVolumeGate::default(),
        }
    }
}

impl Config {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| TickerError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| TickerError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(TickerError::InvalidValue("workers must be > 0"));
        }
        self.indicators.validate()?;
        self.volume.validate()?;
        self.gate.validate()
    }

    pub fn dir_retry_backoff(&self) -> Duration {
        Duration::from_millis(self.dir_retry_backoff_ms)
    }

    /// Feature pipeline settings carried by this config
    pub fn pipeline(&self) -> PipelineConfig {
        PipelineConfig {
            indicators: self.indicators.clone(),
            volume: self.volume.clone(),
            gate: self.gate.clone(),
            validate_data: false,
        }
    }
}
