//! Factor column naming.

use derive_more::Display;
use serde::{Deserialize, Serialize};

/// What a factor column measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum FactorKind {
    /// Trailing price change
    #[display("mom")]
    Momentum,
    /// Trailing standard deviation of returns
    #[display("vol")]
    Volatility,
}

impl FactorKind {
    const ALL: [Self; 2] = [Self::Momentum, Self::Volatility];
}

/// Identity of one factor column: instrument, kind and horizon.
///
/// Renders as `{instrument}_{mom|vol}{horizon}`, e.g. `AAPL_mom30`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[display("{instrument}_{kind}{horizon}")]
pub struct FactorKey {
    /// Instrument identifier
    pub instrument: String,
    /// Factor kind
    pub kind: FactorKind,
    /// Lookback horizon or window in observations
    pub horizon: usize,
}

impl FactorKey {
    /// Create a new key.
    pub fn new(instrument: impl Into<String>, kind: FactorKind, horizon: usize) -> Self {
        Self {
            instrument: instrument.into(),
            kind,
            horizon,
        }
    }

    /// Column name of this factor.
    pub fn render(&self) -> String {
        self.to_string()
    }

    /// Inverse of [`render`](Self::render).
    ///
    /// Returns `None` for anything `render` could not have produced.
    pub fn parse(name: &str) -> Option<Self> {
        let stem = name.trim_end_matches(|c: char| c.is_ascii_digit());
        let digits = &name[stem.len()..];
        if digits.is_empty() || (digits.len() > 1 && digits.starts_with('0')) {
            return None;
        }
        let horizon = digits.parse().ok()?;

        FactorKind::ALL.into_iter().find_map(|kind| {
            let instrument = stem.strip_suffix(&format!("_{kind}"))?;
            (!instrument.is_empty()).then(|| Self::new(instrument, kind, horizon))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("AAPL", FactorKind::Momentum, 30, "AAPL_mom30")]
    #[case("AAPL", FactorKind::Momentum, 90, "AAPL_mom90")]
    #[case("AAPL", FactorKind::Volatility, 30, "AAPL_vol30")]
    #[case("BRK-B", FactorKind::Volatility, 5, "BRK-B_vol5")]
    fn test_render(
        #[case] instrument: &str,
        #[case] kind: FactorKind,
        #[case] horizon: usize,
        #[case] expected: &str,
    ) {
        let key = FactorKey::new(instrument, kind, horizon);
        assert_eq!(key.render(), expected);
        assert_eq!(FactorKey::parse(expected), Some(key));
    }

    #[test]
    fn test_parse_keeps_underscores_in_instrument() {
        let key = FactorKey::parse("X_mom_vol12").unwrap();
        assert_eq!(key.instrument, "X_mom");
        assert_eq!(key.kind, FactorKind::Volatility);
        assert_eq!(key.horizon, 12);
    }

    #[rstest]
    #[case("AAPL")]
    #[case("AAPL_mom")]
    #[case("_mom30")]
    #[case("AAPL_rsi14")]
    #[case("AAPL_mom030")]
    fn test_parse_rejects(#[case] name: &str) {
        assert_eq!(FactorKey::parse(name), None);
    }
}
