//! Daily percent-change returns.

use crate::error::Result;
use crate::panel::Panel;
use crate::prices::PriceMatrix;
use polars::prelude::lit;
use tracing::debug;

/// Date × instrument matrix of simple daily returns.
///
/// Has the price matrix's columns and no leading row; no row is entirely
/// undefined.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnMatrix(Panel);

impl ReturnMatrix {
    /// The underlying panel.
    pub const fn panel(&self) -> &Panel {
        &self.0
    }

    /// Instrument identifiers in column order.
    pub fn instruments(&self) -> impl Iterator<Item = &str> {
        self.0.column_names()
    }

    /// Unwrap into the underlying panel.
    pub fn into_panel(self) -> Panel {
        self.0
    }
}

/// Converts prices into `(p[t] - p[t-1]) / p[t-1]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReturnComputer;

impl ReturnComputer {
    /// Create a return computer.
    pub const fn new() -> Self {
        Self
    }

    /// Compute the return matrix.
    ///
    /// The first row has no predecessor and is dropped rather than zero-filled.
    /// A missing or zero predecessor price leaves that cell undefined. Rows in
    /// which every instrument ends up undefined are dropped.
    pub fn compute(&self, prices: &PriceMatrix) -> Result<ReturnMatrix> {
        let panel = prices.panel();
        let returns = panel
            .map_columns(|price| price.clone() / price.shift(lit(1)) - lit(1.0))?
            .skip_rows(1)
            .drop_empty_rows();

        debug!(
            price_rows = panel.height(),
            return_rows = returns.height(),
            "computed daily returns"
        );
        Ok(ReturnMatrix(returns))
    }
}
