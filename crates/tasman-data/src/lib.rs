#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/tasman/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod cache;
pub mod error;
pub mod fred;
pub mod macro_data;
pub mod panel;
pub mod prices;
pub mod returns;
pub mod source;
pub mod yahoo;

pub use error::{DataError, Result};
pub use macro_data::{IndicatorSpec, MacroAligner, MacroDaily, MacroSeries};
pub use panel::{Panel, PanelColumn, finite_values};
pub use prices::{CoverageReport, PriceMatrix, PriceSeriesNormalizer};
pub use returns::{ReturnComputer, ReturnMatrix};
pub use source::{ApiKey, MacroSource, PriceSource};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
