//! Interfaces of the external data sources the alignment core consumes.
//!
//! Sources may parallelize internally, but each call hands back a complete
//! frame or series; the core never observes partial results.

use crate::error::Result;
use crate::macro_data::{IndicatorSpec, MacroSeries};
use chrono::NaiveDate;
use polars::prelude::DataFrame;
use std::fmt;
use std::future::Future;

/// Source of split/dividend-adjusted daily closing prices.
pub trait PriceSource {
    /// Fetch daily prices for `symbols` between `start` and `end` inclusive.
    ///
    /// Returns a long frame with at least the columns `symbol` (str), `date`
    /// (Date) and `adjusted_close` (f64). Symbols the provider has nothing for
    /// are simply absent; an entirely empty result is
    /// [`DataError::DataUnavailable`](crate::DataError::DataUnavailable).
    fn fetch_prices(
        &self,
        symbols: &[String],
        start: NaiveDate,
        end: NaiveDate,
    ) -> impl Future<Output = Result<DataFrame>>;
}

/// Source of sparse macroeconomic observations.
pub trait MacroSource {
    /// Fetch every observation of one indicator, renamed to its canonical name.
    fn fetch_series(
        &self,
        spec: &IndicatorSpec,
        credential: &ApiKey,
    ) -> impl Future<Output = Result<MacroSeries>>;
}

/// Credential for a macro data provider.
///
/// `Debug` never prints the key itself.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Wrap a key; blank keys count as no credential.
    pub fn new(key: impl Into<String>) -> Option<Self> {
        let key = key.into();
        let trimmed = key.trim();
        (!trimmed.is_empty()).then(|| Self(trimmed.to_string()))
    }

    /// The raw key, for building provider requests.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_key_is_absent() {
        assert!(ApiKey::new("").is_none());
        assert!(ApiKey::new("   ").is_none());
        assert_eq!(ApiKey::new(" abc ").unwrap().expose(), "abc");
    }

    #[test]
    fn test_debug_is_redacted() {
        let key = ApiKey::new("secret-key").unwrap();
        assert!(!format!("{key:?}").contains("secret"));
    }
}
