//! Export of date-indexed tables.
//!
//! Tables render as CSV (a `date` column followed by one column per series,
//! undefined cells left empty) or as a JSON array of row objects (undefined
//! cells as `null`).

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tasman_data::Panel;
use tasman_data::panel::DATE_COLUMN;
use thiserror::Error;

/// Errors that can occur during export operations.
#[derive(Debug, Error)]
pub enum ExportError {
    /// CSV serialization error.
    #[error("CSV serialization error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization error.
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error at {path}: {source}")]
    Io {
        /// File being written.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// Invalid format error.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

impl ExportError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Export format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    /// Comma-separated values format.
    #[default]
    Csv,

    /// Compact JSON format.
    Json,

    /// Pretty-printed JSON format.
    PrettyJson,
}

impl ExportFormat {
    /// Get the file extension for this format.
    pub const fn extension(&self) -> &str {
        match self {
            Self::Csv => "csv",
            Self::Json | Self::PrettyJson => "json",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            "pretty-json" | "pretty_json" => Ok(Self::PrettyJson),
            other => Err(ExportError::InvalidFormat(other.to_string())),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Csv => "csv",
            Self::Json => "json",
            Self::PrettyJson => "pretty-json",
        })
    }
}

/// The tables a run persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// Adjusted close prices
    Prices,
    /// Daily returns
    Returns,
    /// Daily-aligned macro indicators
    Macro,
    /// Momentum and volatility factor seeds
    Features,
    /// Returns joined with macro indicators
    Dataset,
}

impl ArtifactKind {
    /// Every artifact in persistence order.
    pub const ALL: [Self; 5] = [
        Self::Prices,
        Self::Returns,
        Self::Macro,
        Self::Features,
        Self::Dataset,
    ];

    /// Location under the output root, without extension.
    pub const fn stem(&self) -> &'static str {
        match self {
            Self::Prices => "raw/prices",
            Self::Returns => "processed/daily_returns",
            Self::Macro => "raw/macro",
            Self::Features => "processed/features_basic",
            Self::Dataset => "processed/dataset",
        }
    }

    /// Location under the output root for `format`.
    pub fn relative_path(&self, format: ExportFormat) -> PathBuf {
        PathBuf::from(format!("{}.{}", self.stem(), format.extension()))
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Prices => "prices",
            Self::Returns => "returns",
            Self::Macro => "macro",
            Self::Features => "features",
            Self::Dataset => "dataset",
        })
    }
}

/// Trait for exporting data in various formats.
pub trait Exporter {
    /// Export data to a string in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError>;

    /// Export data to a file in the specified format.
    ///
    /// The content is written to a sibling temporary file and renamed into
    /// place, so `path` either holds the complete export or is untouched.
    /// Missing parent directories are created.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or file writing fails.
    fn export_to_file(&self, path: &Path, format: ExportFormat) -> Result<(), ExportError> {
        let content = self.export_to_string(format)?;
        write_atomic(path, content.as_bytes())
    }
}

impl Exporter for Panel {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => {
                let mut wtr = csv::Writer::from_writer(vec![]);
                wtr.write_record(std::iter::once(DATE_COLUMN).chain(self.column_names()))?;
                for (row, date) in self.dates().iter().enumerate() {
                    let mut record = Vec::with_capacity(self.width() + 1);
                    record.push(date.to_string());
                    record.extend(
                        self.columns()
                            .iter()
                            .map(|c| c.get(row).map(|v| v.to_string()).unwrap_or_default()),
                    );
                    wtr.write_record(&record)?;
                }
                let bytes = wtr
                    .into_inner()
                    .map_err(|e| csv::Error::from(e.into_error()))?;
                String::from_utf8(bytes).map_err(|e| ExportError::InvalidFormat(e.to_string()))
            }
            ExportFormat::Json => Ok(serde_json::to_string(&PanelRows(self))?),
            ExportFormat::PrettyJson => Ok(serde_json::to_string_pretty(&PanelRows(self))?),
        }
    }
}

/// Serializes a panel as an array of row objects, keeping column order.
struct PanelRows<'a>(&'a Panel);

struct PanelRow<'a> {
    panel: &'a Panel,
    row: usize,
}

impl Serialize for PanelRows<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.0.height()))?;
        for row in 0..self.0.height() {
            seq.serialize_element(&PanelRow { panel: self.0, row })?;
        }
        seq.end()
    }
}

impl Serialize for PanelRow<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.panel.width() + 1))?;
        map.serialize_entry(DATE_COLUMN, &self.panel.dates()[self.row])?;
        for column in self.panel.columns() {
            map.serialize_entry(column.name(), &column.get(self.row))?;
        }
        map.end()
    }
}

/// Write `bytes` to `path` through a temporary sibling and a rename.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), ExportError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| ExportError::io(parent, e))?;
    }

    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);

    if let Err(e) = fs::write(&tmp, bytes) {
        let _ = fs::remove_file(&tmp);
        return Err(ExportError::io(&tmp, e));
    }
    fs::rename(&tmp, path).map_err(|e| {
        let _ = fs::remove_file(&tmp);
        ExportError::io(path, e)
    })
}
