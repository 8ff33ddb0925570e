//! Daily quote fetching from Yahoo Finance.

use crate::error::{DataError, Result};
use crate::source::PriceSource;
use chrono::{Days, NaiveDate};
use polars::prelude::*;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};
use yahoo_finance_api as yahoo;

/// Yahoo Finance quote provider with rate limiting.
pub struct YahooQuoteProvider {
    provider: yahoo::YahooConnector,
    rate_limit_delay: Duration,
}

impl std::fmt::Debug for YahooQuoteProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YahooQuoteProvider")
            .field("rate_limit_delay", &self.rate_limit_delay)
            .finish_non_exhaustive()
    }
}

impl YahooQuoteProvider {
    /// Create a provider with default rate limiting (1 req/sec).
    pub fn new() -> Result<Self> {
        Self::with_rate_limit(Duration::from_millis(1000))
    }

    /// Create a provider with custom rate limiting.
    pub fn with_rate_limit(rate_limit_delay: Duration) -> Result<Self> {
        Ok(Self {
            provider: yahoo::YahooConnector::new()?,
            rate_limit_delay,
        })
    }

    /// Fetch daily quotes for a single symbol, `start` and `end` inclusive.
    ///
    /// # Returns
    /// A Polars DataFrame with columns: symbol, date, open, high, low, close,
    /// volume, adjusted_close
    pub async fn fetch_quotes(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<DataFrame> {
        validate_request(symbol, start, end)?;

        let start_time = to_offset_datetime(start)?;
        let end_time = to_offset_datetime(end.checked_add_days(Days::new(1)).unwrap_or(end))?;

        let response = self
            .provider
            .get_quote_history(symbol, start_time, end_time)
            .await?;

        let quotes = response
            .quotes()
            .map_err(|e| DataError::YahooApi(e.to_string()))?;

        if quotes.is_empty() {
            return Err(DataError::unavailable(
                symbol,
                "no quotes returned from Yahoo Finance",
            ));
        }

        let timestamps: Vec<i64> = quotes.iter().map(|q| q.timestamp).collect();
        let opens: Vec<f64> = quotes.iter().map(|q| q.open).collect();
        let highs: Vec<f64> = quotes.iter().map(|q| q.high).collect();
        let lows: Vec<f64> = quotes.iter().map(|q| q.low).collect();
        let closes: Vec<f64> = quotes.iter().map(|q| q.close).collect();
        let volumes: Vec<u64> = quotes.iter().map(|q| q.volume).collect();
        let adj_closes: Vec<f64> = quotes.iter().map(|q| q.adjclose).collect();

        let df = DataFrame::new(vec![
            Series::new("symbol".into(), vec![symbol; quotes.len()]).into(),
            Series::new("timestamp".into(), timestamps).into(),
            Series::new("open".into(), opens).into(),
            Series::new("high".into(), highs).into(),
            Series::new("low".into(), lows).into(),
            Series::new("close".into(), closes).into(),
            Series::new("volume".into(), volumes).into(),
            Series::new("adjusted_close".into(), adj_closes).into(),
        ])?;

        let df = df
            .lazy()
            .with_column(
                (col("timestamp") * lit(1_000_000_000))
                    .cast(DataType::Datetime(TimeUnit::Nanoseconds, None))
                    .cast(DataType::Date)
                    .alias("date"),
            )
            .select(&[
                col("symbol"),
                col("date"),
                col("open"),
                col("high"),
                col("low"),
                col("close"),
                col("volume"),
                col("adjusted_close"),
            ])
            .collect()?;

        debug!(symbol, rows = df.height(), "fetched quotes");
        sleep(self.rate_limit_delay).await;

        Ok(df)
    }

    /// Fetch quotes for several symbols into one long frame.
    ///
    /// Symbols that fail are logged and left out; the batch fails only when
    /// every symbol does.
    pub async fn fetch_quotes_batch(
        &self,
        symbols: &[String],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<DataFrame> {
        let mut dfs = Vec::with_capacity(symbols.len());

        for symbol in symbols {
            match self.fetch_quotes(symbol, start, end).await {
                Ok(df) => dfs.push(df.lazy()),
                Err(e) => warn!(symbol = %symbol, error = %e, "failed to fetch quotes"),
            }
        }

        if dfs.is_empty() {
            return Err(DataError::unavailable(
                "price universe",
                format!("no quotes fetched for any of {} symbols", symbols.len()),
            ));
        }

        Ok(concat(dfs, UnionArgs::default())?.collect()?)
    }
}

impl PriceSource for YahooQuoteProvider {
    async fn fetch_prices(
        &self,
        symbols: &[String],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<DataFrame> {
        self.fetch_quotes_batch(symbols, start, end).await
    }
}

/// Reject empty symbols and inverted ranges before touching the network.
pub fn validate_request(symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<()> {
    if start > end {
        return Err(DataError::InvalidDateRange {
            start: start.to_string(),
            end: end.to_string(),
        });
    }
    if symbol.trim().is_empty() {
        return Err(DataError::InvalidSymbol("Empty symbol".to_string()));
    }
    Ok(())
}

fn to_offset_datetime(date: NaiveDate) -> Result<time::OffsetDateTime> {
    let timestamp = date
        .and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
        .ok_or_else(|| DataError::TimeConversion(format!("invalid date {date}")))?;
    time::OffsetDateTime::from_unix_timestamp(timestamp)
        .map_err(|e| DataError::TimeConversion(e.to_string()))
}
