#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/tasman/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod export;
pub mod report;
pub mod sink;

pub use export::{ArtifactKind, ExportError, ExportFormat, Exporter};
pub use report::{ArtifactRecord, ArtifactStatus, RunReport};
pub use sink::{FileTableSink, TableSink, WrittenTable};
