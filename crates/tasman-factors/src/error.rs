//! Error types for factor derivation.

use tasman_data::DataError;
use thiserror::Error;

/// Result type for factor operations.
pub type Result<T> = std::result::Result<T, FactorError>;

/// Errors that can occur while deriving factors.
#[derive(Debug, Error)]
pub enum FactorError {
    /// Price and return matrices do not share dates or instruments.
    #[error("Misaligned index: {0}")]
    MisalignedIndex(String),

    /// A horizon or window is unusable.
    #[error("Invalid factor configuration: {0}")]
    InvalidConfig(String),

    /// Polars error
    #[error("Polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    /// Error from the underlying table layer
    #[error(transparent)]
    Data(#[from] DataError),
}
