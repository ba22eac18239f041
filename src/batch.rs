//! Batch fetching for several cities
//!
//! Serves what it can from the cache, then fetches the rest in small
//! concurrent groups, stopping early when the call budget runs low.

use std::collections::BTreeMap;

use futures::future::join_all;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::forecaster::{FetchedForecast, ForecastSource, Forecaster, StaleReason};

const LIMIT_APPROACHING: &str = "API rate limit approaching. Try again later.";
const LIMIT_REACHED_CACHED: &str = "API limit reached. Using cached data.";
const LIMIT_REACHED: &str = "API limit reached. Try again later.";

/// Options for [`fetch_batch`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
    /// Serve fresh cache entries before making any provider call
    pub prioritize_cached: bool,
    /// Maximum provider calls in flight at once
    pub max_concurrent: usize,
    /// Fetch from the provider even when a fresh entry is cached
    pub force_refresh: bool,
    /// Use only cached data while the budget is near its limit
    pub respect_limits: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            prioritize_cached: true,
            max_concurrent: 3,
            force_refresh: false,
            respect_limits: true,
        }
    }
}

/// Outcome of a batch fetch
#[derive(Debug, Default, Serialize)]
pub struct BatchResult {
    /// Forecasts by city, as named by the caller
    pub data: BTreeMap<String, FetchedForecast>,
    /// Error or warning messages by city
    pub errors: BTreeMap<String, String>,
    /// Provider calls made by this batch
    pub api_calls_made: usize,
    /// Cities served from the cache, fresh or stale
    pub from_cache: Vec<String>,
}

impl BatchResult {
    fn record(&mut self, city: &str, fetched: FetchedForecast) {
        match &fetched.source {
            ForecastSource::Provider => self.api_calls_made += 1,
            ForecastSource::Cache => self.from_cache.push(city.to_string()),
            ForecastSource::StaleCache { .. } => {
                self.from_cache.push(city.to_string());
                if let Some(warning) = fetched.warning() {
                    self.errors.insert(city.to_string(), warning);
                }
            }
        }
        self.data.insert(city.to_string(), fetched);
    }

    /// Serves `city` from the cache at any age, or records `message`
    fn record_stale_or(&mut self, forecaster: &Forecaster, city: &str, message: &str) {
        match forecaster.cached_stale(city) {
            Some(cached) => {
                let source = if cached.is_expired {
                    ForecastSource::StaleCache {
                        reason: StaleReason::BudgetLow,
                        cached_at: cached.cached_at,
                    }
                } else {
                    ForecastSource::Cache
                };
                self.from_cache.push(city.to_string());
                self.errors.insert(city.to_string(), LIMIT_REACHED_CACHED.to_string());
                self.data.insert(
                    city.to_string(),
                    FetchedForecast {
                        forecast: cached.data,
                        source,
                    },
                );
            }
            None => {
                self.errors.insert(city.to_string(), message.to_string());
            }
        }
    }
}

/// Fetches forecasts for `cities`
///
/// # Arguments
/// * `forecaster` - Shared orchestrator
/// * `cities` - City names; blank names are ignored
/// * `options` - Cache and concurrency behavior
///
/// # Returns
/// A [`BatchResult`]; individual failures land in `errors`, never abort the batch
pub async fn fetch_batch(
    forecaster: &Forecaster,
    cities: &[String],
    options: BatchOptions,
) -> BatchResult {
    let mut result = BatchResult::default();
    let cities: Vec<&str> = cities
        .iter()
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .collect();
    if cities.is_empty() {
        return result;
    }

    let cached_only = options.respect_limits && forecaster.is_near_limit();

    if (options.prioritize_cached || cached_only) && !options.force_refresh {
        for city in &cities {
            if let Some(forecast) = forecaster.serve_cached(city) {
                result.record(
                    city,
                    FetchedForecast {
                        forecast,
                        source: ForecastSource::Cache,
                    },
                );
            }
        }
    }

    let to_fetch: Vec<&str> = cities
        .into_iter()
        .filter(|c| !result.data.contains_key(*c))
        .collect();

    if cached_only {
        debug!(skipped = to_fetch.len(), "Call budget near limit, using cache only");
        for city in to_fetch {
            result.errors.insert(city.to_string(), LIMIT_APPROACHING.to_string());
        }
        return result;
    }

    let group_size = options.max_concurrent.max(1);
    let mut groups = to_fetch.chunks(group_size);

    while let Some(group) = groups.next() {
        let outcomes = join_all(group.iter().map(|city| async move {
            if options.force_refresh {
                forecaster.refresh(city).await
            } else {
                forecaster.fetch(city).await
            }
        }))
        .await;

        for (city, outcome) in group.iter().zip(outcomes) {
            match outcome {
                Ok(fetched) => result.record(city, fetched),
                Err(e) => {
                    result
                        .errors
                        .insert(city.to_string(), format!("Failed to fetch: {}", e.user_message()));
                }
            }
        }

        if options.respect_limits && forecaster.is_near_limit() {
            let remaining: Vec<&str> = groups.by_ref().flatten().copied().collect();
            if !remaining.is_empty() {
                warn!(skipped = remaining.len(), "Call budget near limit, stopping batch");
            }
            for city in remaining {
                result.record_stale_or(forecaster, city, LIMIT_REACHED);
            }
            break;
        }
    }

    result
}

/// Warms the cache for `cities` in the background, one call at a time
///
/// Returns `None` without spawning when the budget is near its limit.
pub fn prefetch(forecaster: &Forecaster, cities: Vec<String>) -> Option<JoinHandle<()>> {
    if forecaster.is_near_limit() {
        debug!("Skipping prefetch, call budget near limit");
        return None;
    }

    let forecaster = forecaster.clone();
    Some(tokio::spawn(async move {
        let options = BatchOptions {
            max_concurrent: 1,
            ..BatchOptions::default()
        };
        let result = fetch_batch(&forecaster, &cities, options).await;
        for (city, error) in &result.errors {
            warn!(city = %city, error = %error, "Prefetch failed");
        }
        debug!(
            fetched = result.api_calls_made,
            cached = result.from_cache.len(),
            "Prefetch finished"
        );
    }))
}
