//! Cache-aware price and macro sources.
//!
//! Quotes are served from the SQLite cache when it covers the requested range
//! and fetched from Yahoo Finance otherwise, several symbols at a time. Macro
//! indicators are served from the cache while they are less than a day old.

use super::cache_manager;
use chrono::{Duration, NaiveDate};
use futures::stream::{self, StreamExt};
use indicatif::ProgressBar;
use polars::prelude::*;
use std::sync::Arc;
use tasman_data::cache::{CacheStats, SqliteCache};
use tasman_data::fred::FredClient;
use tasman_data::yahoo::YahooQuoteProvider;
use tasman_data::{ApiKey, DataError, IndicatorSpec, MacroSeries, MacroSource, PriceSource};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Number of symbols fetched concurrently.
const DEFAULT_CONCURRENCY: usize = 10;

/// Columns shared by cached and freshly fetched quote frames.
const QUOTE_COLUMNS: [&str; 5] = ["symbol", "date", "close", "volume", "adjusted_close"];

/// Cached macro indicators older than this are fetched again.
const MACRO_MAX_AGE_DAYS: i64 = 1;

/// A cache shared by both sources; `None` when caching is off or unavailable.
pub(crate) type SharedCache = Arc<Mutex<Option<SqliteCache>>>;

/// How sources use the cache.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FetchConfig {
    /// Whether to use the cache.
    pub use_cache: bool,
    /// Whether to ignore cached data (fresh data is still written back).
    pub force_refresh: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            use_cache: true,
            force_refresh: false,
        }
    }
}

impl FetchConfig {
    /// Open the shared cache this configuration asks for.
    ///
    /// A cache that cannot be opened is logged and the run continues without one.
    pub(crate) fn open_cache(&self) -> SharedCache {
        let cache = if self.use_cache {
            cache_manager::open_cache()
                .inspect_err(|e| warn!(error = %e, "cache unavailable, continuing without it"))
                .ok()
        } else {
            None
        };
        Arc::new(Mutex::new(cache))
    }

    const fn read_cache(&self) -> bool {
        self.use_cache && !self.force_refresh
    }
}

/// Yahoo Finance prices behind the quote cache.
#[derive(Debug)]
pub(crate) struct CachedQuoteSource {
    provider: YahooQuoteProvider,
    cache: SharedCache,
    config: FetchConfig,
    progress: Option<ProgressBar>,
}

impl CachedQuoteSource {
    pub(crate) const fn new(
        provider: YahooQuoteProvider,
        cache: SharedCache,
        config: FetchConfig,
        progress: Option<ProgressBar>,
    ) -> Self {
        Self {
            provider,
            cache,
            config,
            progress,
        }
    }

    /// Split `symbols` into cached frames and symbols that still need fetching.
    async fn load_cached(
        &self,
        symbols: &[String],
        start: NaiveDate,
        end: NaiveDate,
    ) -> (Vec<LazyFrame>, Vec<String>) {
        if !self.config.read_cache() {
            return (Vec::new(), symbols.to_vec());
        }
        let guard = self.cache.lock().await;
        let Some(cache) = guard.as_ref() else {
            return (Vec::new(), symbols.to_vec());
        };

        let mut cached = Vec::new();
        let mut to_fetch = Vec::new();
        for symbol in symbols {
            if cache.has_quotes(symbol, start, end).unwrap_or(false)
                && let Ok(df) = cache.get_quotes(symbol, start, end)
            {
                cached.push(df.lazy());
                continue;
            }
            to_fetch.push(symbol.clone());
        }
        (cached, to_fetch)
    }

    /// Fetch one symbol from Yahoo and write it back to the cache.
    async fn fetch_one(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<LazyFrame, DataError> {
        let df = self.provider.fetch_quotes(symbol, start, end).await?;

        if let Some(cache) = self.cache.lock().await.as_ref()
            && let Err(e) = cache.put_quotes(&df)
        {
            warn!(symbol, error = %e, "failed to cache quotes");
        }

        Ok(df.lazy())
    }
}

impl PriceSource for CachedQuoteSource {
    async fn fetch_prices(
        &self,
        symbols: &[String],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<DataFrame, DataError> {
        let (cached, to_fetch) = self.load_cached(symbols, start, end).await;
        info!(cached = cached.len(), to_fetch = to_fetch.len(), "resolved quote cache");

        if let Some(pb) = &self.progress {
            pb.set_length((cached.len() + to_fetch.len()) as u64);
            pb.set_position(cached.len() as u64);
            if to_fetch.is_empty() {
                pb.set_message("Loading from cache...");
            } else {
                pb.set_message(format!(
                    "Fetching {} symbols ({} concurrent)...",
                    to_fetch.len(),
                    DEFAULT_CONCURRENCY
                ));
            }
        }

        let results: Vec<(String, Result<LazyFrame, DataError>)> = stream::iter(to_fetch)
            .map(|symbol| async move {
                let result = self.fetch_one(&symbol, start, end).await;
                if let Some(pb) = &self.progress {
                    pb.inc(1);
                }
                (symbol, result)
            })
            .buffer_unordered(DEFAULT_CONCURRENCY)
            .collect()
            .await;

        let mut frames = cached;
        for (symbol, result) in results {
            match result {
                Ok(df) => frames.push(df),
                Err(e) => warn!(symbol = %symbol, error = %e, "failed to fetch quotes"),
            }
        }

        if let Some(pb) = &self.progress {
            pb.finish_with_message("Prices loaded");
        }

        if frames.is_empty() {
            return Err(DataError::unavailable(
                "price universe",
                format!("no quotes fetched for any of {} symbols", symbols.len()),
            ));
        }

        let columns: Vec<Expr> = QUOTE_COLUMNS.iter().map(|c| col(*c)).collect();
        let frames: Vec<LazyFrame> = frames
            .into_iter()
            .map(|lf| lf.select(columns.clone()))
            .collect();
        Ok(concat(frames, UnionArgs::default())?.collect()?)
    }
}

/// FRED indicators behind the macro cache.
#[derive(Debug)]
pub(crate) struct CachedMacroSource {
    client: FredClient,
    cache: SharedCache,
    config: FetchConfig,
}

impl CachedMacroSource {
    pub(crate) const fn new(client: FredClient, cache: SharedCache, config: FetchConfig) -> Self {
        Self {
            client,
            cache,
            config,
        }
    }
}

impl MacroSource for CachedMacroSource {
    async fn fetch_series(
        &self,
        spec: &IndicatorSpec,
        credential: &ApiKey,
    ) -> Result<MacroSeries, DataError> {
        if self.config.read_cache()
            && let Some(cache) = self.cache.lock().await.as_ref()
        {
            match cache.get_macro_series(spec, Duration::days(MACRO_MAX_AGE_DAYS)) {
                Ok(Some(series)) if !series.is_empty() => {
                    debug!(indicator = %spec.name, "serving indicator from cache");
                    return Ok(series);
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(indicator = %spec.name, error = %e, "failed to read cached indicator");
                }
            }
        }

        let series = self.client.fetch_series(spec, credential).await?;

        if let Some(cache) = self.cache.lock().await.as_ref()
            && let Err(e) = cache.put_macro_series(&spec.code, &series)
        {
            warn!(indicator = %spec.name, error = %e, "failed to cache indicator");
        }

        Ok(series)
    }
}

/// Cache statistics, if the cache can be opened.
pub(crate) fn cache_stats() -> Option<CacheStats> {
    cache_manager::open_cache()
        .ok()
        .and_then(|cache| cache.get_stats().ok())
}

/// Print the cache location and contents.
pub(crate) fn print_cache_info() {
    println!("  Cache location: {}", cache_manager::cache_path().display());
    if let Some(stats) = cache_stats() {
        println!(
            "  Cached data: {} quotes for {} symbols, {} observations for {} indicators",
            stats.total_quotes, stats.unique_symbols, stats.macro_observations, stats.indicators
        );
    }
}
