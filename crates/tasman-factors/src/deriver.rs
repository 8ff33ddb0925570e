//! Factor table derivation.

use crate::error::{FactorError, Result};
use crate::factor::{Factor, FactorInput};
use crate::key::FactorKey;
use crate::momentum::MomentumFactor;
use crate::volatility::VolatilityFactor;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tasman_data::{Panel, PanelColumn, PriceMatrix, ReturnMatrix};
use tracing::{debug, info};

/// Horizons of the derived factors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FactorConfig {
    /// Momentum lookbacks in observed prices (default: 30, 90)
    pub momentum_horizons: Vec<usize>,
    /// Volatility windows in observed returns (default: 30)
    pub volatility_windows: Vec<usize>,
}

impl Default for FactorConfig {
    fn default() -> Self {
        Self {
            momentum_horizons: vec![30, 90],
            volatility_windows: vec![30],
        }
    }
}

impl FactorConfig {
    /// Check that every horizon is usable and none repeats.
    pub fn validate(&self) -> Result<()> {
        if let Some(h) = self.momentum_horizons.iter().find(|h| **h == 0) {
            return Err(FactorError::InvalidConfig(format!(
                "momentum horizon must be positive, got {h}"
            )));
        }
        if let Some(w) = self.volatility_windows.iter().find(|w| **w < 2) {
            return Err(FactorError::InvalidConfig(format!(
                "volatility window needs at least 2 returns, got {w}"
            )));
        }
        for (name, horizons) in [
            ("momentum", &self.momentum_horizons),
            ("volatility", &self.volatility_windows),
        ] {
            let mut seen = HashSet::new();
            if let Some(h) = horizons.iter().find(|h| !seen.insert(**h)) {
                return Err(FactorError::InvalidConfig(format!(
                    "{name} horizon {h} listed twice"
                )));
            }
        }
        Ok(())
    }

    /// Factors in output column order: momentum by horizon, then volatility.
    pub fn factors(&self) -> Vec<Box<dyn Factor>> {
        let momentum = self
            .momentum_horizons
            .iter()
            .map(|h| Box::new(MomentumFactor::new(*h)) as Box<dyn Factor>);
        let volatility = self
            .volatility_windows
            .iter()
            .map(|w| Box::new(VolatilityFactor::new(*w)) as Box<dyn Factor>);
        momentum.chain(volatility).collect()
    }
}

/// Factor columns over the price dates, one column per (factor, instrument).
///
/// Rows in which every factor is undefined are dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct FactorTable {
    panel: Panel,
    keys: Vec<FactorKey>,
}

impl FactorTable {
    /// The underlying panel; column `i` is named `keys()[i].render()`.
    pub const fn panel(&self) -> &Panel {
        &self.panel
    }

    /// Column identities in column order.
    pub fn keys(&self) -> &[FactorKey] {
        &self.keys
    }

    /// Unwrap into the underlying panel.
    pub fn into_panel(self) -> Panel {
        self.panel
    }
}

/// Derives the factor table from prices and returns.
#[derive(Debug, Clone, Default)]
pub struct FactorDeriver {
    config: FactorConfig,
}

impl FactorDeriver {
    /// Create a deriver.
    pub fn new(config: FactorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The active configuration.
    pub const fn config(&self) -> &FactorConfig {
        &self.config
    }

    /// Derive every configured factor for every instrument.
    ///
    /// Momentum reads prices directly; volatility reads returns. Each factor
    /// sees only the instrument's observed values, so gaps shift the window
    /// rather than poison it.
    ///
    /// # Errors
    /// [`FactorError::MisalignedIndex`] if `returns` has a date or instrument
    /// that `prices` lacks.
    pub fn derive(&self, prices: &PriceMatrix, returns: &ReturnMatrix) -> Result<FactorTable> {
        let price_panel = prices.panel();
        let return_panel = returns.panel();

        let return_rows = return_panel
            .dates()
            .iter()
            .map(|d| {
                price_panel.row_of(*d).ok_or_else(|| {
                    FactorError::MisalignedIndex(format!("return date {d} has no price row"))
                })
            })
            .collect::<Result<Vec<usize>>>()?;

        let instruments: Vec<&str> = prices.instruments().collect();
        if let Some(extra) = returns.instruments().find(|i| !instruments.contains(i)) {
            return Err(FactorError::MisalignedIndex(format!(
                "return instrument '{extra}' has no price column"
            )));
        }

        let height = price_panel.height();
        let mut keys = Vec::new();
        let mut columns = Vec::new();

        for factor in self.config.factors() {
            for instrument in &instruments {
                let key = factor.key(instrument);
                let values = match factor.input() {
                    FactorInput::Prices => {
                        let rows: Vec<usize> = (0..height).collect();
                        project(factor.as_ref(), price_panel.column(instrument), &rows, height)?
                    }
                    FactorInput::Returns => project(
                        factor.as_ref(),
                        return_panel.column(instrument),
                        &return_rows,
                        height,
                    )?,
                };
                columns.push(PanelColumn::new(key.render(), values));
                keys.push(key);
            }
            debug!(factor = %factor.kind(), horizon = factor.horizon(), "derived factor");
        }

        let full = Panel::new(price_panel.dates().to_vec(), columns)?;
        let panel = full.drop_empty_rows();
        info!(
            columns = panel.width(),
            rows = panel.height(),
            "derived factor table"
        );

        Ok(FactorTable { panel, keys })
    }
}

/// Run `factor` over the defined cells of `source` and place each output at
/// the target row of its input; `rows[i]` is the target row of source row `i`.
fn project(
    factor: &dyn Factor,
    source: Option<&PanelColumn>,
    rows: &[usize],
    height: usize,
) -> Result<Vec<Option<f64>>> {
    let mut out = vec![None; height];
    let Some(source) = source else {
        return Ok(out);
    };

    let (targets, observed): (Vec<usize>, Vec<f64>) = source
        .values()
        .iter()
        .zip(rows)
        .filter_map(|(v, row)| v.map(|v| (*row, v)))
        .unzip();

    for (row, value) in targets.into_iter().zip(factor.compute(&observed)?) {
        out[row] = value;
    }
    Ok(out)
}
