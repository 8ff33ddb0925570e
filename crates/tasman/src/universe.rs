//! Investment universes.

/// Trait for stock universes.
pub trait Universe {
    /// Get all symbols in the universe.
    fn symbols(&self) -> Vec<String>;

    /// Check if a symbol is in the universe.
    fn contains(&self, symbol: &str) -> bool {
        self.symbols().iter().any(|s| s == symbol)
    }

    /// Get the number of constituents.
    fn size(&self) -> usize {
        self.symbols().len()
    }
}

/// Sixty liquid US large caps across sectors.
const LARGE_CAP_SYMBOLS: [&str; 60] = [
    "AAPL", "MSFT", "GOOGL", "AMZN", "META", "NVDA", "BRK-B", "XOM", "JNJ", "JPM", "V", "PG",
    "AVGO", "UNH", "HD", "MA", "LLY", "KO", "PFE", "PEP", "ABBV", "BAC", "COST", "CSCO", "ADBE",
    "TMO", "MCD", "NFLX", "DIS", "CRM", "WMT", "NKE", "TXN", "INTC", "AMD", "QCOM", "AMAT", "LIN",
    "ACN", "PM", "DHR", "UPS", "MS", "GS", "BLK", "CAT", "HON", "IBM", "BKNG", "ORCL", "BA", "SPGI",
    "GE", "AMT", "LOW", "MDLZ", "SBUX", "CVX", "NOW", "ISRG",
];

/// The default universe of US large caps.
#[derive(Debug, Clone, Copy, Default)]
pub struct LargeCapUniverse;

impl LargeCapUniverse {
    /// Create the default universe.
    pub const fn new() -> Self {
        Self
    }
}

impl Universe for LargeCapUniverse {
    fn symbols(&self) -> Vec<String> {
        LARGE_CAP_SYMBOLS.iter().map(|s| s.to_string()).collect()
    }

    fn size(&self) -> usize {
        LARGE_CAP_SYMBOLS.len()
    }
}

/// A user-supplied list of symbols.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomUniverse {
    symbols: Vec<String>,
}

impl CustomUniverse {
    /// Build a universe from symbols, trimming, uppercasing and dropping
    /// blanks and repeats while keeping first-seen order.
    pub fn new<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out: Vec<String> = Vec::new();
        for symbol in symbols {
            let symbol = symbol.as_ref().trim().to_ascii_uppercase();
            if !symbol.is_empty() && !out.contains(&symbol) {
                out.push(symbol);
            }
        }
        Self { symbols: out }
    }

    /// Parse a comma-separated list such as `AAPL,msft, BRK-B`.
    pub fn parse(list: &str) -> Self {
        Self::new(list.split(','))
    }
}

impl Universe for CustomUniverse {
    fn symbols(&self) -> Vec<String> {
        self.symbols.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_large_cap_universe() {
        let universe = LargeCapUniverse::new();

        assert_eq!(universe.size(), 60);
        assert_eq!(universe.symbols().len(), 60);
        assert!(universe.contains("AAPL"));
        assert!(universe.contains("BRK-B"));
        assert!(!universe.contains("NOTREAL"));
    }

    #[test]
    fn test_large_cap_symbols_unique() {
        let symbols = LargeCapUniverse::new().symbols();
        let unique: std::collections::HashSet<_> = symbols.iter().collect();
        assert_eq!(unique.len(), symbols.len());
    }

    #[rstest]
    #[case("aapl, MSFT,,AAPL , brk-b", &["AAPL", "MSFT", "BRK-B"])]
    #[case("SPY", &["SPY"])]
    #[case(" , ,", &[])]
    fn test_custom_universe_parse(#[case] list: &str, #[case] expected: &[&str]) {
        let universe = CustomUniverse::parse(list);
        assert_eq!(universe.symbols(), expected);
        assert_eq!(universe.size(), expected.len());
    }
}
