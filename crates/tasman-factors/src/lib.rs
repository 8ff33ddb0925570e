#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/tasman/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod deriver;
pub mod error;
pub mod factor;
pub mod key;
pub mod momentum;
pub mod registry;
pub mod volatility;

pub use deriver::{FactorConfig, FactorDeriver, FactorTable};
pub use error::{FactorError, Result};
pub use factor::{Factor, FactorInput};
pub use key::{FactorKey, FactorKind};
pub use momentum::MomentumFactor;
pub use volatility::VolatilityFactor;

// Re-export registry types for convenience
pub use registry::{
    FactorCategory, FactorInfo, available_factors, configured_factors, factors_by_category,
    get_factor_info,
};
