//! Price matrix normalization.
//!
//! Providers answer with a long frame (one row per symbol and date). The
//! normalizer reshapes it into a dense date × instrument [`PriceMatrix`], the
//! same shape whether one instrument or many were requested.

use crate::error::{DataError, Result};
use crate::panel::{Panel, from_epoch_days};
use chrono::NaiveDate;
use polars::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use tracing::{info, warn};

/// Default provider column holding split/dividend-adjusted closes.
pub const PRICE_COLUMN: &str = "adjusted_close";

/// Which requested instruments came back incomplete.
///
/// Partial coverage is not fatal: gaps stay undefined cells in the matrix and
/// this report travels with the run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CoverageReport {
    /// Number of instruments requested.
    pub requested: usize,
    /// Requested instruments with no observations at all.
    pub missing: Vec<String>,
    /// Undefined cells after an instrument's first observation, per instrument.
    pub interior_gaps: BTreeMap<String, usize>,
    /// Symbols the provider returned that were not requested.
    pub ignored: Vec<String>,
}

impl CoverageReport {
    /// Whether every requested instrument is present without interior gaps.
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty() && self.interior_gaps.is_empty()
    }
}

/// Dense date × instrument matrix of prices.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceMatrix(Panel);

impl PriceMatrix {
    /// Wrap a panel whose columns are instruments.
    ///
    /// # Errors
    /// [`DataError::DataUnavailable`] if the panel has no rows or no columns.
    pub fn new(panel: Panel) -> Result<Self> {
        if panel.is_empty() || panel.width() == 0 {
            return Err(DataError::unavailable(
                "price matrix",
                "no instruments or no dates",
            ));
        }
        Ok(Self(panel))
    }

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

/// Shapes a provider price response into a [`PriceMatrix`].
#[derive(Debug, Clone)]
pub struct PriceSeriesNormalizer {
    price_column: String,
}

impl Default for PriceSeriesNormalizer {
    fn default() -> Self {
        Self {
            price_column: PRICE_COLUMN.to_string(),
        }
    }
}

impl PriceSeriesNormalizer {
    /// Create a normalizer reading [`PRICE_COLUMN`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Read prices from another column of the provider frame.
    pub fn with_price_column(price_column: impl Into<String>) -> Self {
        Self {
            price_column: price_column.into(),
        }
    }

    /// Normalize a long provider frame into a price matrix.
    ///
    /// Columns follow the order of `requested`; an empty `requested` list takes
    /// every symbol in the response, sorted. Rows with a null or non-finite
    /// price are ignored and the first row wins for a repeated (symbol, date).
    ///
    /// # Errors
    /// - [`DataError::Schema`] if `symbol`, `date` or the price column is missing
    /// - [`DataError::DataUnavailable`] if no requested instrument has any price
    pub fn normalize(
        &self,
        response: &DataFrame,
        requested: &[String],
    ) -> Result<(PriceMatrix, CoverageReport)> {
        let mut observations = self.collect_observations(response)?;

        let requested: Vec<String> = if requested.is_empty() {
            observations.keys().cloned().collect()
        } else {
            requested.to_vec()
        };

        let mut coverage = CoverageReport {
            requested: requested.len(),
            ..CoverageReport::default()
        };

        let wanted: HashSet<&str> = requested.iter().map(String::as_str).collect();
        coverage.ignored = observations
            .keys()
            .filter(|s| !wanted.contains(s.as_str()))
            .cloned()
            .collect();
        if !coverage.ignored.is_empty() {
            warn!(symbols = ?coverage.ignored, "ignoring unrequested symbols in price response");
        }

        let mut series = Vec::with_capacity(requested.len());
        let mut seen = HashSet::with_capacity(requested.len());
        for symbol in requested {
            if !seen.insert(symbol.clone()) {
                continue;
            }
            match observations.remove(&symbol) {
                Some(obs) if !obs.is_empty() => series.push((symbol, obs)),
                _ => coverage.missing.push(symbol),
            }
        }

        if series.is_empty() {
            return Err(DataError::unavailable(
                "price universe",
                format!("provider returned no prices for any of {} instruments", coverage.requested),
            ));
        }

        let panel = Panel::from_observations(series)?;
        for column in panel.columns() {
            if let Some(first) = column.first_defined() {
                let gaps = column.values()[first..].iter().filter(|v| v.is_none()).count();
                if gaps > 0 {
                    coverage.interior_gaps.insert(column.name().to_string(), gaps);
                }
            }
        }

        if !coverage.missing.is_empty() {
            warn!(missing = ?coverage.missing, "no prices for some requested instruments");
        }
        info!(
            instruments = panel.width(),
            rows = panel.height(),
            "normalized price matrix"
        );

        Ok((PriceMatrix::new(panel)?, coverage))
    }

    fn collect_observations(
        &self,
        response: &DataFrame,
    ) -> Result<BTreeMap<String, BTreeMap<NaiveDate, f64>>> {
        let symbol_col = required(response, "symbol")?;
        let symbols = symbol_col
            .str()
            .map_err(|e| DataError::Schema(format!("symbol column: {e}")))?;

        let date_col = required(response, "date")?
            .cast(&DataType::Date)?
            .cast(&DataType::Int32)?;
        let days = date_col.i32()?;

        let price_col = required(response, &self.price_column)?.cast(&DataType::Float64)?;
        let prices = price_col.f64()?;

        let mut observations: BTreeMap<String, BTreeMap<NaiveDate, f64>> = BTreeMap::new();
        for ((symbol, day), price) in symbols.into_iter().zip(days).zip(prices) {
            let (Some(symbol), Some(day)) = (symbol, day) else {
                continue;
            };
            let date = from_epoch_days(day)
                .ok_or_else(|| DataError::Parse(format!("date out of range: {day}")))?;
            let series = observations.entry(symbol.to_string()).or_default();
            if let Some(price) = price.filter(|p| p.is_finite()) {
                series.entry(date).or_insert(price);
            }
        }

        Ok(observations)
    }
}

fn required<'a>(frame: &'a DataFrame, name: &str) -> Result<&'a Column> {
    frame
        .column(name)
        .map_err(|_| DataError::Schema(format!("missing column '{name}'")))
}
