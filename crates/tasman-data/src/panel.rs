//! Date-indexed column tables.
//!
//! Every matrix the pipeline produces (prices, returns, daily macro, factors,
//! the assembled dataset) is a [`Panel`]: a strictly increasing date index and
//! an ordered set of uniquely named `f64` columns. A cell is `None` when the
//! value is undefined; undefined cells are never defaulted to zero.

use crate::error::{DataError, Result};
use chrono::{Datelike, NaiveDate};
use polars::prelude::*;
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Name of the index column when a panel is exported.
pub const DATE_COLUMN: &str = "date";

/// Days from 0001-01-01 (CE day 1) to 1970-01-01.
const UNIX_EPOCH_FROM_CE: i32 = 719_163;

/// Days since 1970-01-01, the physical representation of a polars `Date`.
pub(crate) fn epoch_days(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - UNIX_EPOCH_FROM_CE
}

/// Inverse of [`epoch_days`].
pub(crate) fn from_epoch_days(days: i32) -> Option<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(days + UNIX_EPOCH_FROM_CE)
}

/// Read a numeric frame column as optional values; nulls and non-finite
/// values are `None`.
pub fn finite_values(column: &Column) -> Result<Vec<Option<f64>>> {
    let values = column.cast(&DataType::Float64)?;
    Ok(values
        .f64()?
        .into_iter()
        .map(|v| v.filter(|x| x.is_finite()))
        .collect())
}

/// A named column of optional values.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelColumn {
    name: String,
    values: Vec<Option<f64>>,
}

impl PanelColumn {
    /// Create a new column.
    pub fn new(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    /// Column name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All cells, `None` marking undefined values.
    pub fn values(&self) -> &[Option<f64>] {
        &self.values
    }

    /// Cell at `row`; `None` when undefined or out of range.
    pub fn get(&self, row: usize) -> Option<f64> {
        self.values.get(row).copied().flatten()
    }

    /// Number of defined cells.
    pub fn defined_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }

    /// Row of the first defined cell.
    pub fn first_defined(&self) -> Option<usize> {
        self.values.iter().position(Option::is_some)
    }

    fn forward_filled(&self) -> Self {
        let mut last = None;
        let values = self
            .values
            .iter()
            .map(|v| {
                if v.is_some() {
                    last = *v;
                }
                last
            })
            .collect();
        Self::new(self.name.clone(), values)
    }

    fn select_rows(&self, keep: &[bool]) -> Self {
        let values = self
            .values
            .iter()
            .zip(keep)
            .filter_map(|(v, k)| k.then_some(*v))
            .collect();
        Self::new(self.name.clone(), values)
    }
}

/// A strictly date-ordered table of optional `f64` columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Panel {
    dates: Vec<NaiveDate>,
    columns: Vec<PanelColumn>,
}

impl Panel {
    /// Create a panel, validating the index and the column set.
    ///
    /// # Errors
    /// - [`DataError::MisalignedIndex`] if dates are not strictly increasing or a
    ///   column length differs from the index length
    /// - [`DataError::DuplicateColumn`] if two columns share a name or a column
    ///   is named like the index
    pub fn new(dates: Vec<NaiveDate>, columns: Vec<PanelColumn>) -> Result<Self> {
        if let Some(pair) = dates.windows(2).find(|w| w[0] >= w[1]) {
            return Err(DataError::MisalignedIndex(format!(
                "dates must be strictly increasing, found {} followed by {}",
                pair[0], pair[1]
            )));
        }

        let mut seen = HashSet::with_capacity(columns.len());
        for column in &columns {
            if column.values.len() != dates.len() {
                return Err(DataError::MisalignedIndex(format!(
                    "column '{}' has {} rows, index has {}",
                    column.name,
                    column.values.len(),
                    dates.len()
                )));
            }
            if column.name == DATE_COLUMN || !seen.insert(column.name.as_str()) {
                return Err(DataError::DuplicateColumn(column.name.clone()));
            }
        }

        Ok(Self { dates, columns })
    }

    /// Build a panel from sparse per-column observations.
    ///
    /// The index is the sorted union of every column's dates; a column has a
    /// defined cell only where it has an observation.
    pub fn from_observations(series: Vec<(String, BTreeMap<NaiveDate, f64>)>) -> Result<Self> {
        let dates: Vec<NaiveDate> = series
            .iter()
            .flat_map(|(_, obs)| obs.keys().copied())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let columns = series
            .into_iter()
            .map(|(name, obs)| {
                let values = dates.iter().map(|d| obs.get(d).copied()).collect();
                PanelColumn::new(name, values)
            })
            .collect();

        Self::new(dates, columns)
    }

    /// The date index.
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Columns in order.
    pub fn columns(&self) -> &[PanelColumn] {
        &self.columns
    }

    /// Column names in order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(PanelColumn::name)
    }

    /// Look up a column by name.
    pub fn column(&self, name: &str) -> Option<&PanelColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Cell value of `name` at `row`.
    pub fn value(&self, name: &str, row: usize) -> Option<f64> {
        self.column(name).and_then(|c| c.get(row))
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.dates.len()
    }

    /// Number of value columns (the index is not counted).
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Whether the panel has no rows.
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// First date of the index.
    pub fn first_date(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    /// Last date of the index.
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    /// Row holding `date`, if any.
    pub fn row_of(&self, date: NaiveDate) -> Option<usize> {
        self.dates.binary_search(&date).ok()
    }

    /// Whether every cell of `row` is undefined.
    pub fn row_is_empty(&self, row: usize) -> bool {
        self.columns.iter().all(|c| c.get(row).is_none())
    }

    /// Propagate each column's last defined value forward through later rows.
    ///
    /// Only earlier-or-equal rows feed a cell; rows before a column's first
    /// defined value stay undefined. Applying this twice equals applying it once.
    #[must_use]
    pub fn forward_fill(&self) -> Self {
        Self {
            dates: self.dates.clone(),
            columns: self.columns.iter().map(PanelColumn::forward_filled).collect(),
        }
    }

    /// Drop rows whose cells are all undefined.
    #[must_use]
    pub fn drop_empty_rows(self) -> Self {
        let keep: Vec<bool> = (0..self.height()).map(|r| !self.row_is_empty(r)).collect();
        self.select_rows(&keep)
    }

    /// Drop the first `n` rows.
    #[must_use]
    pub fn skip_rows(self, n: usize) -> Self {
        let keep: Vec<bool> = (0..self.height()).map(|r| r >= n).collect();
        self.select_rows(&keep)
    }

    fn select_rows(self, keep: &[bool]) -> Self {
        let dates = self
            .dates
            .iter()
            .zip(keep)
            .filter_map(|(d, k)| k.then_some(*d))
            .collect();
        let columns = self.columns.iter().map(|c| c.select_rows(keep)).collect();
        Self { dates, columns }
    }

    /// Append the columns of `other`, which must share this panel's index.
    pub fn hconcat(self, other: Self) -> Result<Self> {
        if self.dates != other.dates {
            return Err(DataError::MisalignedIndex(format!(
                "cannot concatenate panels over different indices ({} vs {} rows)",
                self.height(),
                other.height()
            )));
        }
        let mut columns = self.columns;
        columns.extend(other.columns);
        Self::new(self.dates, columns)
    }

    /// Evaluate `expr` over every column and return the results on the same
    /// index.
    ///
    /// `expr` receives the column expression and must keep the column length,
    /// as shifts and rolling windows do. Nulls and non-finite results become
    /// undefined cells.
    pub fn map_columns(&self, expr: impl Fn(Expr) -> Expr) -> Result<Self> {
        if self.columns.is_empty() {
            return Ok(self.clone());
        }

        let exprs: Vec<Expr> = self
            .columns
            .iter()
            .map(|c| expr(col(c.name.as_str())).alias(c.name.as_str()))
            .collect();
        let frame = self.to_frame()?.lazy().select(exprs).collect()?;

        let columns = self
            .columns
            .iter()
            .map(|c| {
                let values = finite_values(frame.column(&c.name)?)?;
                Ok(PanelColumn::new(c.name.clone(), values))
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(self.dates.clone(), columns)
    }

    /// Convert to a polars frame: a `date` column of dtype `Date` followed by
    /// one `Float64` column per value column, undefined cells as nulls.
    pub fn to_frame(&self) -> Result<DataFrame> {
        let days: Vec<i32> = self.dates.iter().map(|d| epoch_days(*d)).collect();
        let mut frame_columns: Vec<Column> = Vec::with_capacity(self.width() + 1);
        frame_columns.push(
            Series::new(DATE_COLUMN.into(), days)
                .cast(&DataType::Date)?
                .into(),
        );
        for column in &self.columns {
            frame_columns.push(Series::new(column.name.as_str().into(), column.values.clone()).into());
        }
        Ok(DataFrame::new(frame_columns)?)
    }
}
