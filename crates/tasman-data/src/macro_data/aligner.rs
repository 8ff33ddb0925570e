use super::{IndicatorSpec, MacroDaily, MacroSeries};
use crate::error::{DataError, Result};
use crate::panel::{Panel, PanelColumn};
use crate::source::{ApiKey, MacroSource};
use futures::future::try_join_all;
use std::collections::HashSet;
use tracing::{debug, info};

/// Resamples irregular indicator series onto a daily calendar.
#[derive(Debug, Clone, Copy, Default)]
pub struct MacroAligner;

impl MacroAligner {
    /// Create an aligner.
    pub const fn new() -> Self {
        Self
    }

    /// Fetch every indicator and align them.
    ///
    /// Without a credential the stage is skipped and `Ok(None)` is returned.
    /// Indicators are fetched concurrently; any single failure fails the whole
    /// stage.
    pub async fn run<S: MacroSource>(
        &self,
        source: &S,
        credential: Option<&ApiKey>,
        specs: &[IndicatorSpec],
    ) -> Result<Option<MacroDaily>> {
        let Some(credential) = credential else {
            info!("no macro credential supplied, skipping macro indicators");
            return Ok(None);
        };

        let series = try_join_all(specs.iter().map(|spec| source.fetch_series(spec, credential))).await?;
        self.align(series).map(Some)
    }

    /// Union the series and resample onto every calendar day between the
    /// earliest and latest observation, forward-filling each column.
    ///
    /// Values only ever flow from earlier to later days.
    ///
    /// # Errors
    /// - [`DataError::DuplicateColumn`] if two series share a name
    /// - [`DataError::DataUnavailable`] if no series has any observation
    pub fn align(&self, series: Vec<MacroSeries>) -> Result<MacroDaily> {
        let mut names = HashSet::with_capacity(series.len());
        for s in &series {
            if !names.insert(s.name.as_str()) {
                return Err(DataError::DuplicateColumn(s.name.clone()));
            }
        }

        let first = series.iter().filter_map(|s| s.observations.keys().next()).min();
        let last = series.iter().filter_map(|s| s.observations.keys().next_back()).max();
        let (Some(&first), Some(&last)) = (first, last) else {
            return Err(DataError::unavailable(
                "macro indicators",
                "no observations in any series",
            ));
        };

        let calendar: Vec<_> = first.iter_days().take_while(|d| *d <= last).collect();
        let columns = series
            .into_iter()
            .map(|s| {
                let values = calendar.iter().map(|d| s.observations.get(d).copied()).collect();
                PanelColumn::new(s.name, values)
            })
            .collect();

        let panel = Panel::new(calendar, columns)?.forward_fill();
        debug!(
            indicators = panel.width(),
            days = panel.height(),
            from = %first,
            to = %last,
            "aligned macro indicators to daily calendar"
        );
        Ok(MacroDaily(panel))
    }
}
