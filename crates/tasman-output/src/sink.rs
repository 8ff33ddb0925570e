//! Where run artifacts go.

use crate::export::{ArtifactKind, ExportError, ExportFormat, Exporter, write_atomic};
use crate::report::RunReport;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tasman_data::Panel;
use tracing::info;

/// File name of the run report under the output root.
pub const REPORT_FILE: &str = "run_report.json";

/// Outcome of persisting one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WrittenTable {
    /// Where the table was written
    pub path: PathBuf,
    /// Data rows written (header excluded)
    pub rows: usize,
    /// Columns written, the date column included
    pub columns: usize,
}

/// Destination for run artifacts.
pub trait TableSink {
    /// Persist one table.
    fn write_table(&self, kind: ArtifactKind, panel: &Panel) -> Result<WrittenTable, ExportError>;

    /// Remove what an earlier run left for `kind`, so a table that was not
    /// written this run is absent rather than stale.
    fn discard_table(&self, kind: ArtifactKind) -> Result<(), ExportError>;

    /// Persist the run report.
    fn write_report(&self, report: &RunReport) -> Result<PathBuf, ExportError>;
}

/// Writes artifacts under an output root in the `raw/` + `processed/` layout.
#[derive(Debug, Clone)]
pub struct FileTableSink {
    root: PathBuf,
    format: ExportFormat,
}

impl FileTableSink {
    /// Create a sink rooted at `root`.
    pub fn new(root: impl Into<PathBuf>, format: ExportFormat) -> Self {
        Self {
            root: root.into(),
            format,
        }
    }

    /// Output root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Table format.
    pub const fn format(&self) -> ExportFormat {
        self.format
    }

    /// Where `kind` is written.
    pub fn path_of(&self, kind: ArtifactKind) -> PathBuf {
        self.root.join(kind.relative_path(self.format))
    }
}

impl TableSink for FileTableSink {
    fn write_table(&self, kind: ArtifactKind, panel: &Panel) -> Result<WrittenTable, ExportError> {
        let path = self.path_of(kind);
        panel.export_to_file(&path, self.format)?;

        let written = WrittenTable {
            path,
            rows: panel.height(),
            columns: panel.width() + 1,
        };
        info!(
            artifact = %kind,
            path = %written.path.display(),
            rows = written.rows,
            "wrote artifact"
        );
        Ok(written)
    }

    fn discard_table(&self, kind: ArtifactKind) -> Result<(), ExportError> {
        let path = self.path_of(kind);
        match fs::remove_file(&path) {
            Ok(()) => {
                info!(artifact = %kind, path = %path.display(), "removed stale artifact");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ExportError::io(&path, e)),
        }
    }

    fn write_report(&self, report: &RunReport) -> Result<PathBuf, ExportError> {
        let path = self.root.join(REPORT_FILE);
        write_atomic(&path, report.to_json()?.as_bytes())?;
        Ok(path)
    }
}
