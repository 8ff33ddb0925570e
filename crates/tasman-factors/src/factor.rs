//! The per-instrument factor interface.

use crate::error::Result;
use crate::key::{FactorKey, FactorKind};
use polars::prelude::*;
use tasman_data::finite_values;

/// Column holding one instrument's observed values while a factor runs.
const OBSERVED: &str = "observed";

/// Which matrix a factor reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactorInput {
    /// The price matrix
    Prices,
    /// The return matrix
    Returns,
}

/// A factor computed independently for each instrument.
///
/// Implementations see only one instrument's *observed* values, in date order,
/// and produce one output per input value. An undefined output is `None`.
pub trait Factor {
    /// Factor kind.
    fn kind(&self) -> FactorKind;

    /// Lookback horizon or window.
    fn horizon(&self) -> usize;

    /// Matrix the factor is computed from.
    fn input(&self) -> FactorInput;

    /// Expression over the observed-values column, or `None` when the factor
    /// is undefined everywhere.
    fn expr(&self, observed: Expr) -> Option<Expr>;

    /// Compute the factor over an instrument's observed values.
    fn compute(&self, observed: &[f64]) -> Result<Vec<Option<f64>>> {
        let Some(expr) = self.expr(col(OBSERVED)) else {
            return Ok(vec![None; observed.len()]);
        };
        if observed.is_empty() {
            return Ok(Vec::new());
        }

        let frame = df!(OBSERVED => observed)?
            .lazy()
            .select([expr.alias(OBSERVED)])
            .collect()?;
        Ok(finite_values(frame.column(OBSERVED)?)?)
    }

    /// Column identity for `instrument`.
    fn key(&self, instrument: &str) -> FactorKey {
        FactorKey::new(instrument, self.kind(), self.horizon())
    }
}
