//! Price momentum.
//!
//! Momentum captures how far an instrument has run over the last `k`
//! observations: `p[j] / p[j-k] - 1`.

use crate::factor::{Factor, FactorInput};
use crate::key::FactorKind;
use polars::prelude::*;

/// Trailing percent change over `horizon` observed prices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MomentumFactor {
    horizon: usize,
}

impl MomentumFactor {
    /// Create a momentum factor over `horizon` observations.
    pub const fn new(horizon: usize) -> Self {
        Self { horizon }
    }
}

impl Factor for MomentumFactor {
    fn kind(&self) -> FactorKind {
        FactorKind::Momentum
    }

    fn horizon(&self) -> usize {
        self.horizon
    }

    fn input(&self) -> FactorInput {
        FactorInput::Prices
    }

    /// The first `horizon` outputs have no base price and are undefined, as is
    /// any output whose base price is zero.
    fn expr(&self, observed: Expr) -> Option<Expr> {
        let base = observed.clone().shift(lit(self.horizon as i64));
        Some(observed / base - lit(1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_leading_observations_undefined() {
        let prices: Vec<f64> = (1..=35).map(f64::from).collect();
        let mom = MomentumFactor::new(30).compute(&prices).unwrap();

        assert_eq!(mom.len(), 35);
        assert!(mom[..30].iter().all(Option::is_none));
        assert_relative_eq!(mom[30].unwrap(), 31.0 / 1.0 - 1.0);
        assert_relative_eq!(mom[34].unwrap(), 35.0 / 5.0 - 1.0);
    }

    #[test]
    fn test_zero_base_is_undefined() {
        let mom = MomentumFactor::new(1).compute(&[0.0, 5.0, 10.0]).unwrap();
        assert_eq!(mom, vec![None, None, Some(1.0)]);
    }

    #[test]
    fn test_zero_horizon_is_flat() {
        let mom = MomentumFactor::new(0).compute(&[3.0, 4.0]).unwrap();
        assert_eq!(mom, vec![Some(0.0), Some(0.0)]);
    }

    #[test]
    fn test_horizon_longer_than_history() {
        let mom = MomentumFactor::new(5).compute(&[1.0, 2.0]).unwrap();
        assert_eq!(mom, vec![None, None]);
    }
}
