//! Dataset assembly.
//!
//! The dataset is indexed by the return dates. Macro values are looked up on
//! the same date and only ever carried forward from earlier rows, so no row
//! sees a macro value published after it.

use serde::{Deserialize, Serialize};
use tasman_data::{MacroDaily, Panel, PanelColumn, ReturnMatrix, Result};
use tasman_factors::FactorTable;
use tracing::{debug, info};

/// Dataset assembly options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// Append the factor columns after the return columns
    pub include_factors: bool,
}

/// Returns joined with daily macro indicators.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureDataset {
    panel: Panel,
    macro_included: bool,
}

impl FeatureDataset {
    /// The underlying panel: return columns, then factor columns (if any),
    /// then macro columns (if any).
    pub const fn panel(&self) -> &Panel {
        &self.panel
    }

    /// Whether macro columns were joined.
    pub const fn macro_included(&self) -> bool {
        self.macro_included
    }

    /// Unwrap into the underlying panel.
    pub fn into_panel(self) -> Panel {
        self.panel
    }
}

/// Joins returns with optional factors and optional macro data.
#[derive(Debug, Clone, Copy, Default)]
pub struct DatasetAssembler;

impl DatasetAssembler {
    /// Create an assembler.
    pub const fn new() -> Self {
        Self
    }

    /// Join returns with macro data, or pass returns through when there is none.
    pub fn assemble(
        &self,
        returns: &ReturnMatrix,
        macro_daily: Option<&MacroDaily>,
    ) -> Result<FeatureDataset> {
        self.assemble_with_factors(returns, None, macro_daily)
    }

    /// Join returns with factors and macro data.
    ///
    /// Every return date is kept. Factor values are joined on exact dates.
    /// Macro values are taken on the exact date within the macro calendar's
    /// span, with residual gaps filled from earlier rows of that span; rows
    /// after the last macro date stay undefined.
    ///
    /// # Errors
    /// [`DataError::DuplicateColumn`](tasman_data::DataError::DuplicateColumn)
    /// if a macro or factor column shares a name with another column.
    pub fn assemble_with_factors(
        &self,
        returns: &ReturnMatrix,
        factors: Option<&FactorTable>,
        macro_daily: Option<&MacroDaily>,
    ) -> Result<FeatureDataset> {
        let mut panel = returns.panel().clone();
        let dates = panel.dates().to_vec();

        if let Some(factors) = factors {
            let joined = exact_join(&dates, factors.panel());
            panel = panel.hconcat(Panel::new(dates.clone(), joined)?)?;
            debug!(columns = factors.panel().width(), "joined factor columns");
        }

        if let Some(macro_daily) = macro_daily {
            let joined = span_fill_join(&dates, macro_daily.panel());
            panel = panel.hconcat(Panel::new(dates.clone(), joined)?)?;
        }

        info!(
            rows = panel.height(),
            columns = panel.width(),
            macro_included = macro_daily.is_some(),
            "assembled dataset"
        );

        Ok(FeatureDataset {
            panel,
            macro_included: macro_daily.is_some(),
        })
    }
}

/// Columns of `source` looked up on each of `dates`.
fn exact_join(dates: &[chrono::NaiveDate], source: &Panel) -> Vec<PanelColumn> {
    let rows: Vec<Option<usize>> = dates.iter().map(|d| source.row_of(*d)).collect();
    source
        .columns()
        .iter()
        .map(|c| {
            let values = rows.iter().map(|r| r.and_then(|r| c.get(r))).collect();
            PanelColumn::new(c.name(), values)
        })
        .collect()
}

/// Exact-date lookup restricted to `source`'s date span, forward-filled within
/// that span only.
fn span_fill_join(dates: &[chrono::NaiveDate], source: &Panel) -> Vec<PanelColumn> {
    let (Some(first), Some(last)) = (source.first_date(), source.last_date()) else {
        return exact_join(dates, source);
    };

    exact_join(dates, source)
        .into_iter()
        .map(|column| {
            let mut carried = None;
            let values = column
                .values()
                .iter()
                .zip(dates)
                .map(|(value, date)| {
                    if *date < first || *date > last {
                        return None;
                    }
                    if value.is_some() {
                        carried = *value;
                    }
                    carried
                })
                .collect();
            PanelColumn::new(column.name(), values)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Days, NaiveDate};
    use std::collections::BTreeMap;
    use tasman_data::{DataError, MacroAligner, MacroSeries, PriceMatrix, ReturnComputer};
    use tasman_factors::FactorDeriver;

    fn day(n: u64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .checked_add_days(Days::new(n - 1))
            .unwrap()
    }

    /// Prices on days `0..=last` so returns cover days `1..=last`.
    fn returns_through(last: u64) -> (PriceMatrix, ReturnMatrix) {
        let dates = (0..=last)
            .map(|n| {
                NaiveDate::from_ymd_opt(2023, 12, 31)
                    .unwrap()
                    .checked_add_days(Days::new(n))
                    .unwrap()
            })
            .collect();
        let values = (0..=last).map(|n| Some(100.0 + n as f64)).collect();
        let prices =
            PriceMatrix::new(Panel::new(dates, vec![PanelColumn::new("AAPL", values)]).unwrap())
                .unwrap();
        let returns = ReturnComputer::new().compute(&prices).unwrap();
        (prices, returns)
    }

    fn macro_daily(obs: &[(u64, f64)]) -> MacroDaily {
        let observations: BTreeMap<NaiveDate, f64> = obs.iter().map(|(d, v)| (day(*d), *v)).collect();
        MacroAligner::new()
            .align(vec![MacroSeries::new("fed_funds", observations)])
            .unwrap()
    }

    #[test]
    fn test_returns_only_without_macro() {
        let (_, returns) = returns_through(10);
        let dataset = DatasetAssembler::new().assemble(&returns, None).unwrap();

        assert!(!dataset.macro_included());
        assert_eq!(dataset.panel(), returns.panel());
    }

    #[test]
    fn test_all_return_rows_kept_past_macro_span() {
        let (_, returns) = returns_through(100);
        let daily = macro_daily(&[(1, 5.0), (20, 5.25), (50, 5.5)]);

        let dataset = DatasetAssembler::new().assemble(&returns, Some(&daily)).unwrap();
        let panel = dataset.panel();

        assert!(dataset.macro_included());
        assert_eq!(panel.height(), 100);
        assert_eq!(panel.dates(), returns.panel().dates());

        let fed = panel.column("fed_funds").unwrap();
        assert_eq!(fed.get(0), Some(5.0));
        assert_eq!(fed.get(18), Some(5.0));
        assert_eq!(fed.get(19), Some(5.25));
        assert_eq!(fed.get(49), Some(5.5));
        assert!(fed.values()[50..].iter().all(Option::is_none));
        assert_eq!(fed.defined_count(), 50);
    }

    #[test]
    fn test_return_columns_never_filled() {
        let prices = PriceMatrix::new(
            Panel::new(
                vec![day(1), day(2), day(3), day(4)],
                vec![
                    PanelColumn::new("A", vec![Some(1.0), Some(2.0), None, Some(4.0)]),
                    PanelColumn::new("B", vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0)]),
                ],
            )
            .unwrap(),
        )
        .unwrap();
        let returns = ReturnComputer::new().compute(&prices).unwrap();
        let daily = macro_daily(&[(1, 1.0)]);

        let dataset = DatasetAssembler::new().assemble(&returns, Some(&daily)).unwrap();
        assert_eq!(dataset.panel().column("A").unwrap().values(), &[Some(1.0), None, None]);
        assert_eq!(dataset.panel().dates(), &[day(2), day(3), day(4)]);
    }

    #[test]
    fn test_macro_before_first_return_date_not_leaked_backwards() {
        let (_, returns) = returns_through(10);
        let daily = macro_daily(&[(5, 2.0), (8, 3.0)]);

        let dataset = DatasetAssembler::new().assemble(&returns, Some(&daily)).unwrap();
        let fed = dataset.panel().column("fed_funds").unwrap();
        assert_eq!(
            fed.values(),
            &[None, None, None, None, Some(2.0), Some(2.0), Some(2.0), Some(3.0), None, None]
        );
    }

    #[test]
    fn test_factors_joined_on_exact_dates() {
        let (prices, returns) = returns_through(10);
        let factors = FactorDeriver::new(tasman_factors::FactorConfig {
            momentum_horizons: vec![3],
            volatility_windows: vec![2],
        })
        .unwrap()
        .derive(&prices, &returns)
        .unwrap();

        let dataset = DatasetAssembler::new()
            .assemble_with_factors(&returns, Some(&factors), None)
            .unwrap();
        let names: Vec<&str> = dataset.panel().column_names().collect();
        assert_eq!(names, vec!["AAPL", "AAPL_mom3", "AAPL_vol2"]);
        assert_eq!(dataset.panel().value("AAPL_mom3", 0), None);
        assert!(dataset.panel().value("AAPL_mom3", 2).is_some());
        assert!(!dataset.macro_included());
    }

    #[test]
    fn test_name_clash_rejected() {
        let (_, returns) = returns_through(3);
        let clash = MacroAligner::new()
            .align(vec![MacroSeries::new("AAPL", BTreeMap::from([(day(1), 1.0)]))])
            .unwrap();

        let result = DatasetAssembler::new().assemble(&returns, Some(&clash));
        assert!(matches!(result, Err(DataError::DuplicateColumn(_))));
    }
}
