//! Factor Registry
//!
//! Catalog of the factor seeds the pipeline can derive, for listing and
//! lookup by name.

use crate::deriver::FactorConfig;
use crate::factor::FactorInput;
use crate::key::FactorKind;
use std::collections::HashMap;

/// Available factor categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FactorCategory {
    /// Momentum factors (trailing price change)
    Momentum,
    /// Volatility factors (dispersion of returns)
    Volatility,
}

impl From<FactorKind> for FactorCategory {
    fn from(kind: FactorKind) -> Self {
        match kind {
            FactorKind::Momentum => Self::Momentum,
            FactorKind::Volatility => Self::Volatility,
        }
    }
}

/// Factor metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactorInfo {
    /// Factor name, the column suffix (e.g. `mom30`)
    pub name: String,
    /// Factor category
    pub category: FactorCategory,
    /// Lookback horizon or window
    pub horizon: usize,
    /// Brief description of what the factor measures
    pub description: String,
    /// Matrix the factor reads
    pub input: FactorInput,
}

/// Factor info for every factor a configuration derives, in column order.
pub fn configured_factors(config: &FactorConfig) -> Vec<FactorInfo> {
    config
        .factors()
        .iter()
        .map(|f| {
            let horizon = f.horizon();
            let description = match f.kind() {
                FactorKind::Momentum => {
                    format!("Price change over the last {horizon} observed prices")
                }
                FactorKind::Volatility => {
                    format!("Sample standard deviation of the last {horizon} daily returns")
                }
            };
            FactorInfo {
                name: format!("{}{}", f.kind(), horizon),
                category: f.kind().into(),
                horizon,
                description,
                input: f.input(),
            }
        })
        .collect()
}

/// Get all factors of the default configuration
pub fn available_factors() -> Vec<FactorInfo> {
    configured_factors(&FactorConfig::default())
}

/// Get factors by category
pub fn factors_by_category(category: FactorCategory) -> Vec<FactorInfo> {
    available_factors()
        .into_iter()
        .filter(|f| f.category == category)
        .collect()
}

/// Get factor info by name
pub fn get_factor_info(name: &str) -> Option<FactorInfo> {
    available_factors().into_iter().find(|f| f.name == name)
}

/// Count factors by category
pub fn count_by_category() -> HashMap<FactorCategory, usize> {
    let mut counts = HashMap::new();
    for factor in available_factors() {
        *counts.entry(factor.category).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_available_factors() {
        let names: Vec<String> = available_factors().into_iter().map(|f| f.name).collect();
        assert_eq!(names, vec!["mom30", "mom90", "vol30"]);
    }

    #[test]
    fn test_factors_by_category() {
        assert_eq!(factors_by_category(FactorCategory::Momentum).len(), 2);
        assert_eq!(factors_by_category(FactorCategory::Volatility).len(), 1);
    }

    #[test]
    fn test_get_factor_info() {
        let vol = get_factor_info("vol30").unwrap();
        assert_eq!(vol.category, FactorCategory::Volatility);
        assert_eq!(vol.horizon, 30);
        assert_eq!(vol.input, FactorInput::Returns);

        assert!(get_factor_info("nonexistent_factor").is_none());
    }

    #[test]
    fn test_count_by_category() {
        let counts = count_by_category();
        assert_eq!(counts.get(&FactorCategory::Momentum), Some(&2));
        assert_eq!(counts.get(&FactorCategory::Volatility), Some(&1));
    }

    #[test]
    fn test_configured_factors_follow_config() {
        let config = FactorConfig {
            momentum_horizons: vec![5],
            volatility_windows: vec![10, 20],
        };
        let names: Vec<String> = configured_factors(&config).into_iter().map(|f| f.name).collect();
        assert_eq!(names, vec!["mom5", "vol10", "vol20"]);
    }
}
