//! FRED API client with rate limiting.

use crate::error::{DataError, Result};
use crate::macro_data::{IndicatorSpec, MacroSeries};
use crate::source::{ApiKey, MacroSource};
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep};
use tracing::debug;

/// FRED API base URL
const FRED_BASE_URL: &str = "https://api.stlouisfed.org/fred";

/// Default rate limit: FRED allows 120 requests per minute
const DEFAULT_RATE_LIMIT: Duration = Duration::from_millis(500);

/// Placeholder FRED uses for a missing observation
const MISSING_VALUE: &str = ".";

#[derive(Debug, Deserialize)]
struct ObservationsResponse {
    observations: Vec<Observation>,
}

#[derive(Debug, Deserialize)]
struct Observation {
    date: String,
    value: String,
}

/// Rate limiter to enforce a minimum interval between requests.
struct RateLimiter {
    last_request: Instant,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval: Duration) -> Self {
        Self {
            last_request: Instant::now() - min_interval,
            min_interval,
        }
    }

    async fn wait(&mut self) {
        let elapsed = self.last_request.elapsed();
        if elapsed < self.min_interval {
            sleep(self.min_interval - elapsed).await;
        }
        self.last_request = Instant::now();
    }
}

/// FRED `series/observations` client.
pub struct FredClient {
    client: reqwest::Client,
    rate_limiter: Arc<Mutex<RateLimiter>>,
    base_url: String,
}

impl std::fmt::Debug for FredClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FredClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl FredClient {
    /// Create a client with the default rate limit.
    pub fn new() -> Result<Self> {
        Self::with_rate_limit(DEFAULT_RATE_LIMIT)
    }

    /// Create a client with a custom minimum interval between requests.
    pub fn with_rate_limit(min_interval: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(DataError::Network)?;

        Ok(Self {
            client,
            rate_limiter: Arc::new(Mutex::new(RateLimiter::new(min_interval))),
            base_url: FRED_BASE_URL.to_string(),
        })
    }

    /// Point the client at another host (a proxy or mirror).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Fetch all observations of one series.
    pub async fn get_observations(
        &self,
        series_id: &str,
        credential: &ApiKey,
    ) -> Result<BTreeMap<NaiveDate, f64>> {
        if series_id.is_empty() {
            return Err(DataError::InvalidSymbol("Empty series id".to_string()));
        }

        self.rate_limiter.lock().await.wait().await;

        let url = format!("{}/series/observations", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("series_id", series_id),
                ("api_key", credential.expose()),
                ("file_type", "json"),
            ])
            .send()
            .await
            .map_err(DataError::Network)?;

        if !response.status().is_success() {
            return Err(DataError::FredApi(format!(
                "Failed to fetch observations for {}: HTTP {}",
                series_id,
                response.status()
            )));
        }

        let body = response.text().await.map_err(DataError::Network)?;
        let observations = parse_observations(&body)?;
        debug!(series_id, observations = observations.len(), "fetched FRED series");
        Ok(observations)
    }
}

impl MacroSource for FredClient {
    async fn fetch_series(&self, spec: &IndicatorSpec, credential: &ApiKey) -> Result<MacroSeries> {
        let observations = self.get_observations(&spec.code, credential).await?;
        Ok(MacroSeries::new(spec.name.clone(), observations))
    }
}

/// Parse a `series/observations` JSON body, dropping missing (`"."`) values.
pub fn parse_observations(body: &str) -> Result<BTreeMap<NaiveDate, f64>> {
    let response: ObservationsResponse = serde_json::from_str(body)?;

    let mut observations = BTreeMap::new();
    for obs in response.observations {
        if obs.value == MISSING_VALUE {
            continue;
        }
        let date = NaiveDate::parse_from_str(&obs.date, "%Y-%m-%d")
            .map_err(|e| DataError::Parse(format!("FRED date '{}': {}", obs.date, e)))?;
        let value: f64 = obs
            .value
            .parse()
            .map_err(|e| DataError::Parse(format!("FRED value '{}': {}", obs.value, e)))?;
        observations.insert(date, value);
    }

    Ok(observations)
}
