//! Macroeconomic indicators on a daily calendar.
//!
//! Indicators arrive at their own frequency (monthly CPI, daily treasury
//! yields, ...). [`MacroAligner`] unions them and resamples onto every calendar
//! day, carrying each value forward until the next observation.

mod aligner;

pub use aligner::MacroAligner;

use crate::panel::Panel;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One indicator to fetch: provider series code and canonical column name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndicatorSpec {
    /// Provider series identifier (e.g. `FEDFUNDS`)
    pub code: String,
    /// Canonical column name (e.g. `fed_funds`)
    pub name: String,
}

impl IndicatorSpec {
    /// Create a new indicator spec.
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
        }
    }

    /// Effective fed funds rate, CPI and the 10-year treasury yield.
    pub fn default_catalog() -> Vec<Self> {
        vec![
            Self::new("FEDFUNDS", "fed_funds"),
            Self::new("CPIAUCSL", "cpi"),
            Self::new("DGS10", "treasury_10y"),
        ]
    }
}

/// Sparse observations of one indicator under its canonical name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MacroSeries {
    /// Canonical indicator name
    pub name: String,
    /// Observed values by date
    pub observations: BTreeMap<NaiveDate, f64>,
}

impl MacroSeries {
    /// Create a series from observations.
    pub fn new(name: impl Into<String>, observations: BTreeMap<NaiveDate, f64>) -> Self {
        Self {
            name: name.into(),
            observations,
        }
    }

    /// Whether the series has no observations.
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}

/// Macro indicators on a contiguous daily calendar, forward-filled.
///
/// The value at `d` is the last observation at or before `d`; days before an
/// indicator's first observation are undefined.
#[derive(Debug, Clone, PartialEq)]
pub struct MacroDaily(Panel);

impl MacroDaily {
    /// The underlying panel.
    pub const fn panel(&self) -> &Panel {
        &self.0
    }

    /// Indicator names in column order.
    pub fn indicators(&self) -> impl Iterator<Item = &str> {
        self.0.column_names()
    }

    /// First calendar day.
    pub fn first_date(&self) -> Option<NaiveDate> {
        self.0.first_date()
    }

    /// Last calendar day.
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.0.last_date()
    }

    /// Unwrap into the underlying panel.
    pub fn into_panel(self) -> Panel {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog() {
        let catalog = IndicatorSpec::default_catalog();
        let names: Vec<&str> = catalog.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["fed_funds", "cpi", "treasury_10y"]);
        assert_eq!(catalog[1].code, "CPIAUCSL");
    }
}
