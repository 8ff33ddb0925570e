//! Run report.

use crate::export::{ArtifactKind, ExportError};
use crate::sink::WrittenTable;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use tasman_data::CoverageReport;

/// What happened to one artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ArtifactStatus {
    /// The artifact was persisted.
    Written {
        /// File location
        path: PathBuf,
        /// Data rows
        rows: usize,
        /// Columns, the date column included
        columns: usize,
    },
    /// The artifact was intentionally not produced.
    Skipped {
        /// Why (e.g. no macro credential)
        reason: String,
    },
    /// Computing or persisting the artifact failed.
    Failed {
        /// Error message
        error: String,
    },
}

impl ArtifactStatus {
    /// A skipped status.
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped {
            reason: reason.into(),
        }
    }

    /// A failed status from any error.
    pub fn failed(error: impl fmt::Display) -> Self {
        Self::Failed {
            error: error.to_string(),
        }
    }

    /// Whether this is a failure.
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    const fn label(&self) -> &'static str {
        match self {
            Self::Written { .. } => "written",
            Self::Skipped { .. } => "skipped",
            Self::Failed { .. } => "FAILED",
        }
    }
}

impl From<WrittenTable> for ArtifactStatus {
    fn from(table: WrittenTable) -> Self {
        Self::Written {
            path: table.path,
            rows: table.rows,
            columns: table.columns,
        }
    }
}

/// One line of the run report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactRecord {
    /// Which artifact
    pub kind: ArtifactKind,
    /// What happened to it
    #[serde(flatten)]
    pub status: ArtifactStatus,
}

/// Summary of one pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// When the run finished
    pub generated_at: DateTime<Utc>,
    /// First requested date
    pub start: NaiveDate,
    /// Last requested date
    pub end: NaiveDate,
    /// Per-artifact outcomes in persistence order
    pub artifacts: Vec<ArtifactRecord>,
    /// Price coverage, when prices were fetched
    pub coverage: Option<CoverageReport>,
    /// Whether the dataset carries macro columns
    pub macro_included: bool,
}

impl RunReport {
    /// Create an empty report for a date range.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            generated_at: Utc::now(),
            start,
            end,
            artifacts: Vec::new(),
            coverage: None,
            macro_included: false,
        }
    }

    /// Record the outcome of an artifact, replacing an earlier record of it.
    pub fn record(&mut self, kind: ArtifactKind, status: ArtifactStatus) {
        match self.artifacts.iter_mut().find(|a| a.kind == kind) {
            Some(existing) => existing.status = status,
            None => self.artifacts.push(ArtifactRecord { kind, status }),
        }
    }

    /// Outcome of `kind`, if recorded.
    pub fn status(&self, kind: ArtifactKind) -> Option<&ArtifactStatus> {
        self.artifacts
            .iter()
            .find(|a| a.kind == kind)
            .map(|a| &a.status)
    }

    /// Whether any artifact failed.
    pub fn has_failures(&self) -> bool {
        self.artifacts.iter().any(|a| a.status.is_failed())
    }

    /// Convert report to JSON string.
    pub fn to_json(&self) -> Result<String, ExportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Format as ASCII table for terminal display.
    pub fn to_ascii_table(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("\nRun Report: {} to {}\n", self.start, self.end));
        output.push_str(&"=".repeat(80));
        output.push('\n');
        output.push_str(&format!(
            "{:<10} {:<8} {:>8} {:>8}  {}\n",
            "Artifact", "Status", "Rows", "Columns", "Detail"
        ));
        output.push_str(&"-".repeat(80));
        output.push('\n');

        for record in &self.artifacts {
            let (rows, columns, detail) = match &record.status {
                ArtifactStatus::Written {
                    path,
                    rows,
                    columns,
                } => (rows.to_string(), columns.to_string(), path.display().to_string()),
                ArtifactStatus::Skipped { reason } => (String::new(), String::new(), reason.clone()),
                ArtifactStatus::Failed { error } => (String::new(), String::new(), error.clone()),
            };
            output.push_str(&format!(
                "{:<10} {:<8} {:>8} {:>8}  {}\n",
                record.kind.to_string(),
                record.status.label(),
                rows,
                columns,
                detail
            ));
        }

        output.push_str(&"-".repeat(80));
        output.push('\n');
        if let Some(coverage) = &self.coverage {
            output.push_str(&format!(
                "Instruments: {} requested, {} missing",
                coverage.requested,
                coverage.missing.len()
            ));
            if !coverage.missing.is_empty() {
                output.push_str(&format!(" ({})", coverage.missing.join(", ")));
            }
            output.push('\n');
        }
        output.push_str(&format!(
            "Macro included: {}\n",
            if self.macro_included { "yes" } else { "no" }
        ));
        output.push_str(&"=".repeat(80));
        output.push('\n');

        output
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Run Report: {} to {}", self.start, self.end)?;
        for record in &self.artifacts {
            writeln!(f, "  {}: {}", record.kind, record.status.label())?;
        }
        Ok(())
    }
}
