//! SQLite caching layer for quotes and macro observations.

use crate::error::{DataError, Result};
use crate::macro_data::{IndicatorSpec, MacroSeries};
use crate::panel::{epoch_days, from_epoch_days};
use chrono::{DateTime, NaiveDate, Utc};
use polars::prelude::*;
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Share of calendar days that must be cached before a range counts as covered.
/// Roughly 252 trading days per year is ~69% of calendar days.
const MIN_CALENDAR_COVERAGE: f64 = 0.6;

/// Largest gap, in days, allowed between either end of the requested range
/// and the first or last cached quote; covers a weekend plus a holiday.
const MAX_EDGE_GAP_DAYS: i64 = 4;

/// SQLite cache for quotes and macro observations.
#[derive(Debug)]
pub struct SqliteCache {
    conn: Connection,
}

impl SqliteCache {
    /// Create a new SQLite cache.
    ///
    /// # Arguments
    /// * `path` - Path to the SQLite database file
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let cache = Self { conn };
        cache.initialize_schema()?;
        Ok(cache)
    }

    /// Create an in-memory cache (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let cache = Self { conn };
        cache.initialize_schema()?;
        Ok(cache)
    }

    fn initialize_schema(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS quotes (
                symbol TEXT NOT NULL,
                date TEXT NOT NULL,
                close REAL NOT NULL,
                volume INTEGER NOT NULL,
                adjusted_close REAL NOT NULL,
                cached_at TEXT NOT NULL,
                PRIMARY KEY (symbol, date)
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_quotes_symbol_date ON quotes(symbol, date)",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS macro_observations (
                code TEXT NOT NULL,
                date TEXT NOT NULL,
                value REAL NOT NULL,
                cached_at TEXT NOT NULL,
                PRIMARY KEY (code, date)
            )",
            [],
        )?;

        Ok(())
    }

    /// Check if quotes are cached for a symbol and date range.
    ///
    /// The cached quotes must reach both ends of the range and fill enough of
    /// it; a cache that stops short of `end` does not cover the range.
    pub fn has_quotes(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<bool> {
        let (count, first, last): (i64, Option<String>, Option<String>) = self.conn.query_row(
            "SELECT COUNT(*), MIN(date), MAX(date) FROM quotes
             WHERE symbol = ?1 AND date >= ?2 AND date <= ?3",
            params![symbol, start.to_string(), end.to_string()],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;

        let (Some(first), Some(last)) = (first, last) else {
            return Ok(false);
        };
        let first = parse_date(&first)?;
        let last = parse_date(&last)?;
        let edge = chrono::Duration::days(MAX_EDGE_GAP_DAYS);
        if first - start > edge || end - last > edge {
            return Ok(false);
        }

        let days = (end - start).num_days() + 1;
        let expected_count = (days as f64 * MIN_CALENDAR_COVERAGE) as i64;

        Ok(count >= expected_count)
    }

    /// Get cached quotes for a symbol and date range.
    ///
    /// Returns a frame with columns symbol, date, close, volume, adjusted_close.
    pub fn get_quotes(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<DataFrame> {
        let mut stmt = self.conn.prepare(
            "SELECT date, close, volume, adjusted_close
             FROM quotes
             WHERE symbol = ?1 AND date >= ?2 AND date <= ?3
             ORDER BY date ASC",
        )?;

        let mut days = Vec::new();
        let mut closes = Vec::new();
        let mut volumes = Vec::new();
        let mut adj_closes = Vec::new();

        let rows = stmt.query_map(params![symbol, start.to_string(), end.to_string()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, f64>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, f64>(3)?,
            ))
        })?;

        for row in rows {
            let (date, close, volume, adj_close) = row?;
            days.push(epoch_days(parse_date(&date)?));
            closes.push(close);
            volumes.push(volume as u64);
            adj_closes.push(adj_close);
        }

        if days.is_empty() {
            return Err(DataError::unavailable(symbol, "no cached quotes"));
        }

        let df = DataFrame::new(vec![
            Series::new("symbol".into(), vec![symbol; days.len()]).into(),
            Series::new("date".into(), days).cast(&DataType::Date)?.into(),
            Series::new("close".into(), closes).into(),
            Series::new("volume".into(), volumes).into(),
            Series::new("adjusted_close".into(), adj_closes).into(),
        ])?;

        Ok(df)
    }

    /// Store quotes in the cache.
    ///
    /// Expects the provider frame layout (symbol, date, close, volume,
    /// adjusted_close); rows with a null price are skipped.
    pub fn put_quotes(&self, df: &DataFrame) -> Result<usize> {
        let cached_at = Utc::now().to_rfc3339();

        let symbols = df.column("symbol")?.str()?;
        let days = df
            .column("date")?
            .cast(&DataType::Date)?
            .cast(&DataType::Int32)?;
        let days = days.i32()?;
        let closes = df.column("close")?.cast(&DataType::Float64)?;
        let closes = closes.f64()?;
        let volumes = df.column("volume")?.cast(&DataType::Int64)?;
        let volumes = volumes.i64()?;
        let adj_closes = df.column("adjusted_close")?.cast(&DataType::Float64)?;
        let adj_closes = adj_closes.f64()?;

        let tx = self.conn.unchecked_transaction()?;
        let mut written = 0;

        for i in 0..df.height() {
            let (Some(symbol), Some(day), Some(adj_close)) =
                (symbols.get(i), days.get(i), adj_closes.get(i))
            else {
                continue;
            };
            let date = from_epoch_days(day)
                .ok_or_else(|| DataError::Parse(format!("date out of range: {day}")))?;
            let close = closes.get(i).unwrap_or(adj_close);
            let volume = volumes.get(i).unwrap_or(0);

            tx.execute(
                "INSERT OR REPLACE INTO quotes
                 (symbol, date, close, volume, adjusted_close, cached_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![symbol, date.to_string(), close, volume, adj_close, cached_at],
            )?;
            written += 1;
        }

        tx.commit()?;
        Ok(written)
    }

    /// Store every observation of one indicator, replacing older copies.
    pub fn put_macro_series(&self, code: &str, series: &MacroSeries) -> Result<()> {
        let cached_at = Utc::now().to_rfc3339();
        let tx = self.conn.unchecked_transaction()?;

        tx.execute(
            "DELETE FROM macro_observations WHERE code = ?1",
            params![code],
        )?;
        for (date, value) in &series.observations {
            tx.execute(
                "INSERT INTO macro_observations (code, date, value, cached_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![code, date.to_string(), value, cached_at],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    /// Get a cached indicator, renamed to the indicator's configured name.
    ///
    /// Returns `None` when nothing is cached or the copy is older than `max_age`.
    pub fn get_macro_series(
        &self,
        spec: &IndicatorSpec,
        max_age: chrono::Duration,
    ) -> Result<Option<MacroSeries>> {
        let cached_at: Option<String> = self
            .conn
            .query_row(
                "SELECT MIN(cached_at) FROM macro_observations WHERE code = ?1",
                params![spec.code],
                |row| row.get(0),
            )
            .optional()?
            .flatten();

        let Some(cached_at) = cached_at else {
            return Ok(None);
        };
        let cached_at = DateTime::parse_from_rfc3339(&cached_at)
            .map_err(|e| DataError::Cache(format!("bad timestamp '{cached_at}': {e}")))?;
        if Utc::now().signed_duration_since(cached_at) > max_age {
            return Ok(None);
        }

        let mut stmt = self.conn.prepare(
            "SELECT date, value FROM macro_observations WHERE code = ?1 ORDER BY date ASC",
        )?;
        let rows = stmt.query_map(params![spec.code], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
        })?;

        let mut observations = BTreeMap::new();
        for row in rows {
            let (date, value) = row?;
            observations.insert(parse_date(&date)?, value);
        }

        Ok(Some(MacroSeries::new(spec.name.clone(), observations)))
    }

    /// Clear all cached data.
    pub fn clear_all(&self) -> Result<()> {
        self.conn.execute("DELETE FROM quotes", [])?;
        self.conn.execute("DELETE FROM macro_observations", [])?;
        Ok(())
    }

    /// Get cache statistics.
    pub fn get_stats(&self) -> Result<CacheStats> {
        let quotes_count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM quotes", [], |row| row.get(0))?;

        let symbols_count: i64 =
            self.conn
                .query_row("SELECT COUNT(DISTINCT symbol) FROM quotes", [], |row| {
                    row.get(0)
                })?;

        let macro_count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM macro_observations",
            [],
            |row| row.get(0),
        )?;

        let indicators_count: i64 = self.conn.query_row(
            "SELECT COUNT(DISTINCT code) FROM macro_observations",
            [],
            |row| row.get(0),
        )?;

        Ok(CacheStats {
            total_quotes: quotes_count as usize,
            unique_symbols: symbols_count as usize,
            macro_observations: macro_count as usize,
            indicators: indicators_count as usize,
        })
    }
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| DataError::Cache(format!("bad cached date '{s}': {e}")))
}

/// Cache statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Total number of quote records
    pub total_quotes: usize,
    /// Number of unique symbols
    pub unique_symbols: usize,
    /// Total number of macro observations
    pub macro_observations: usize,
    /// Number of distinct indicators
    pub indicators: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn quotes(symbol: &str, rows: &[(u32, f64)]) -> DataFrame {
        let days: Vec<i32> = rows.iter().map(|r| epoch_days(day(r.0))).collect();
        let prices: Vec<f64> = rows.iter().map(|r| r.1).collect();
        DataFrame::new(vec![
            Series::new("symbol".into(), vec![symbol; rows.len()]).into(),
            Series::new("date".into(), days)
                .cast(&DataType::Date)
                .unwrap()
                .into(),
            Series::new("close".into(), prices.clone()).into(),
            Series::new("volume".into(), vec![1_000u64; rows.len()]).into(),
            Series::new("adjusted_close".into(), prices).into(),
        ])
        .unwrap()
    }

    #[test]
    fn test_cache_initialization() {
        let cache = SqliteCache::in_memory();
        assert!(cache.is_ok());
    }

    #[test]
    fn test_quote_round_trip() {
        let cache = SqliteCache::in_memory().unwrap();
        let written = cache
            .put_quotes(&quotes("AAPL", &[(2, 101.0), (1, 100.0), (3, 102.0)]))
            .unwrap();
        assert_eq!(written, 3);

        let df = cache.get_quotes("AAPL", day(1), day(2)).unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(df.column("date").unwrap().dtype(), &DataType::Date);
        let prices = df.column("adjusted_close").unwrap().f64().unwrap();
        assert_eq!(prices.get(0), Some(100.0));
        assert_eq!(prices.get(1), Some(101.0));
    }

    #[test]
    fn test_missing_quotes_are_unavailable() {
        let cache = SqliteCache::in_memory().unwrap();
        let result = cache.get_quotes("AAPL", day(1), day(5));
        assert!(matches!(result, Err(DataError::DataUnavailable { .. })));
    }

    #[test]
    fn test_has_quotes_requires_coverage() {
        let cache = SqliteCache::in_memory().unwrap();
        cache
            .put_quotes(&quotes("AAPL", &[(1, 1.0), (2, 1.0), (3, 1.0), (4, 1.0)]))
            .unwrap();

        assert!(cache.has_quotes("AAPL", day(1), day(5)).unwrap());
        assert!(!cache.has_quotes("AAPL", day(1), day(31)).unwrap());
        assert!(!cache.has_quotes("MSFT", day(1), day(5)).unwrap());
    }

    #[test]
    fn test_has_quotes_requires_recent_tail() {
        let cache = SqliteCache::in_memory().unwrap();
        let rows: Vec<(u32, f64)> = (1..=24).map(|d| (d, 100.0)).collect();
        cache.put_quotes(&quotes("AAPL", &rows)).unwrap();

        // enough rows for the whole month, but the last week is missing
        assert!(!cache.has_quotes("AAPL", day(1), day(31)).unwrap());
        assert!(cache.has_quotes("AAPL", day(1), day(27)).unwrap());
    }

    #[test]
    fn test_has_quotes_requires_early_head() {
        let cache = SqliteCache::in_memory().unwrap();
        let rows: Vec<(u32, f64)> = (10..=31).map(|d| (d, 100.0)).collect();
        cache.put_quotes(&quotes("AAPL", &rows)).unwrap();

        assert!(!cache.has_quotes("AAPL", day(1), day(31)).unwrap());
        assert!(cache.has_quotes("AAPL", day(7), day(31)).unwrap());
    }

    #[test]
    fn test_macro_round_trip() {
        let cache = SqliteCache::in_memory().unwrap();
        let spec = IndicatorSpec::new("FEDFUNDS", "fed_funds");
        let series = MacroSeries::new("fed_funds", BTreeMap::from([(day(1), 5.0), (day(5), 5.25)]));

        assert!(cache
            .get_macro_series(&spec, chrono::Duration::days(1))
            .unwrap()
            .is_none());

        cache.put_macro_series(&spec.code, &series).unwrap();
        let cached = cache
            .get_macro_series(&spec, chrono::Duration::days(1))
            .unwrap()
            .unwrap();
        assert_eq!(cached, series);

        let stale = cache
            .get_macro_series(&spec, chrono::Duration::seconds(-1))
            .unwrap();
        assert!(stale.is_none());
    }

    #[test]
    fn test_cache_stats_and_clear() {
        let cache = SqliteCache::in_memory().unwrap();
        cache.put_quotes(&quotes("AAPL", &[(1, 1.0), (2, 2.0)])).unwrap();
        cache.put_quotes(&quotes("MSFT", &[(1, 1.0)])).unwrap();
        cache
            .put_macro_series("CPIAUCSL", &MacroSeries::new("cpi", BTreeMap::from([(day(1), 300.0)])))
            .unwrap();

        let stats = cache.get_stats().unwrap();
        assert_eq!(stats.total_quotes, 3);
        assert_eq!(stats.unique_symbols, 2);
        assert_eq!(stats.macro_observations, 1);
        assert_eq!(stats.indicators, 1);

        cache.clear_all().unwrap();
        assert_eq!(cache.get_stats().unwrap(), CacheStats::default());
    }
}
