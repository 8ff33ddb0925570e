//! Run configuration.

use crate::assemble::DatasetConfig;
use crate::universe::{LargeCapUniverse, Universe};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tasman_data::{ApiKey, IndicatorSpec};
use tasman_factors::{FactorConfig, FactorError};
use tasman_output::ExportFormat;
use thiserror::Error;

/// Errors in a run configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Cannot read config {path}: {source}")]
    Io {
        /// Config file path
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// The configuration file is not valid JSON for [`RunConfig`].
    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),

    /// No instruments to fetch.
    #[error("Universe is empty")]
    EmptyUniverse,

    /// Start date after end date.
    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidDateRange {
        /// Start date
        start: NaiveDate,
        /// End date
        end: NaiveDate,
    },

    /// No output directory.
    #[error("Output directory is empty")]
    EmptyOutputDir,

    /// Unusable factor horizons.
    #[error(transparent)]
    Factors(#[from] FactorError),
}

/// Everything one run needs.
///
/// Every field has a default, so a JSON file only needs the fields it
/// changes. The macro credential is never read from or written to JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Root of the `raw/` and `processed/` artifact directories
    pub output_dir: PathBuf,
    /// First date to fetch
    pub start: NaiveDate,
    /// Last date to fetch; today when unset
    pub end: Option<NaiveDate>,
    /// Instruments to fetch, in output column order
    pub universe: Vec<String>,
    /// Macro indicators to fetch
    pub indicators: Vec<IndicatorSpec>,
    /// Factor horizons
    pub factors: FactorConfig,
    /// Dataset assembly options
    pub dataset: DatasetConfig,
    /// Artifact format
    pub format: ExportFormat,
    /// Macro provider credential; macro data is skipped without one
    #[serde(skip)]
    pub fred_api_key: Option<ApiKey>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("data"),
            start: NaiveDate::from_ymd_opt(2018, 1, 1).unwrap_or_default(),
            end: None,
            universe: LargeCapUniverse::new().symbols(),
            indicators: IndicatorSpec::default_catalog(),
            factors: FactorConfig::default(),
            dataset: DatasetConfig::default(),
            format: ExportFormat::Csv,
            fred_api_key: None,
        }
    }
}

impl RunConfig {
    /// Load a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&content)
    }

    /// Parse a configuration from JSON text.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Last date to fetch.
    pub fn end_date(&self) -> NaiveDate {
        self.end.unwrap_or_else(|| Utc::now().date_naive())
    }

    /// Check the configuration before any fetching starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.universe.iter().all(|s| s.trim().is_empty()) {
            return Err(ConfigError::EmptyUniverse);
        }
        let end = self.end_date();
        if self.start > end {
            return Err(ConfigError::InvalidDateRange {
                start: self.start,
                end,
            });
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(ConfigError::EmptyOutputDir);
        }
        self.factors.validate()?;
        Ok(())
    }
}
