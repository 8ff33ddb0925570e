#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/tasman/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod assemble;
pub mod config;
pub mod pipeline;
pub mod universe;

// Re-export main types from sub-crates
pub use tasman_data as data;
pub use tasman_factors as factors;
pub use tasman_output as output;

pub use assemble::{DatasetAssembler, DatasetConfig, FeatureDataset};
pub use config::{ConfigError, RunConfig};
pub use pipeline::{Pipeline, PipelineError};
pub use universe::{CustomUniverse, LargeCapUniverse, Universe};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
