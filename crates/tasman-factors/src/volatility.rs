//! Return volatility.

use crate::factor::{Factor, FactorInput};
use crate::key::FactorKind;
use polars::prelude::*;

/// Sample standard deviation (n - 1 denominator) of the trailing `window`
/// observed returns.
///
/// Position `i` covers observations `i + 1 - window ..= i`; positions with
/// fewer than `window` observations behind them are undefined, as is every
/// position when `window < 2`. Not annualized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolatilityFactor {
    window: usize,
}

impl VolatilityFactor {
    /// Create a volatility factor over `window` returns.
    pub const fn new(window: usize) -> Self {
        Self { window }
    }
}

impl Factor for VolatilityFactor {
    fn kind(&self) -> FactorKind {
        FactorKind::Volatility
    }

    fn horizon(&self) -> usize {
        self.window
    }

    fn input(&self) -> FactorInput {
        FactorInput::Returns
    }

    fn expr(&self, observed: Expr) -> Option<Expr> {
        (self.window >= 2).then(|| {
            observed.rolling_std(RollingOptionsFixedWindow {
                window_size: self.window,
                min_periods: self.window,
                ..Default::default()
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_undefined_until_full_window() {
        let returns: Vec<f64> = (0..31).map(|i| if i % 2 == 0 { 0.01 } else { -0.01 }).collect();
        let vol = VolatilityFactor::new(30).compute(&returns).unwrap();

        assert!(vol[..29].iter().all(Option::is_none));
        assert!(vol[29].is_some());
        assert!(vol[30].is_some());
    }

    #[test]
    fn test_sample_denominator() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let vol = VolatilityFactor::new(8).compute(&values).unwrap();
        // population std is 2.0; sample std is sqrt(32 / 7)
        assert_relative_eq!(vol[7].unwrap(), (32.0_f64 / 7.0).sqrt(), epsilon = 1e-9);
    }

    #[test]
    fn test_rolling_window_alignment() {
        let out = VolatilityFactor::new(3).compute(&[1.0, 2.0, 3.0, 5.0]).unwrap();
        assert_eq!(out[0], None);
        assert_eq!(out[1], None);
        assert_relative_eq!(out[2].unwrap(), 1.0, epsilon = 1e-9);
        assert_relative_eq!(out[3].unwrap(), (7.0_f64 / 3.0).sqrt(), epsilon = 1e-9);
    }

    #[test]
    fn test_short_input_is_undefined() {
        let short = VolatilityFactor::new(3).compute(&[1.0, 2.0]).unwrap();
        assert!(short.iter().all(Option::is_none));

        let narrow = VolatilityFactor::new(1).compute(&[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(narrow, vec![None, None, None]);
    }

    #[test]
    fn test_constant_returns_have_zero_volatility() {
        let vol = VolatilityFactor::new(3).compute(&[0.5; 5]).unwrap();
        assert_relative_eq!(vol[4].unwrap(), 0.0, epsilon = 1e-6);
    }
}
