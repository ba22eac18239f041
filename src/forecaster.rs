//! Fetch orchestration: cache, call budget, provider and stale fallback
//!
//! A [`Forecaster`] owns one call budget, one response cache and the refresh
//! bookkeeping. It is cheap to clone; clones share all state.
//!
//! A request for a city resolves in this order:
//!
//! 1. A fresh cache entry is returned immediately. When the entry is older
//!    than the refresh threshold a detached background refresh is started.
//! 2. With the call budget exhausted, the newest cached entry of any age is
//!    returned, otherwise [`FetchError::RateLimited`].
//! 3. The provider is called. Success is recorded, enriched and cached.
//! 4. On provider failure the newest cached entry of any age is returned,
//!    otherwise [`FetchError::Provider`].

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::budget::{CallBudget, UsageSnapshot};
use crate::cache::{normalize_key, CacheStats, CachedData, ResponseCache};
use crate::clock::{Clock, SystemClock};
use crate::config::{Config, PolicyConfig};
use crate::data::{Forecast, GeocodeError, ProviderError};
use crate::insights::{Enricher, InsightClient};
use crate::provider::{ForecastProvider, TomorrowProvider};
use crate::refresh::{RefreshCoordinator, RefreshMessage};

/// Why a stale entry was served instead of fresh data
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StaleReason {
    /// The call budget is exhausted
    RateLimited {
        #[serde(serialize_with = "serialize_minutes", rename = "retry_after_minutes")]
        retry_after: Duration,
    },
    /// The provider call failed with this message
    ProviderFailed { message: String },
    /// A batch stopped early with the budget close to its limit
    BudgetLow,
}

/// Where a returned forecast came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum ForecastSource {
    /// Fresh cache entry
    Cache,
    /// New provider response
    Provider,
    /// Cache entry past its TTL, served as a fallback
    StaleCache {
        reason: StaleReason,
        cached_at: DateTime<Utc>,
    },
}

/// A forecast together with its provenance
#[derive(Debug, Clone, Serialize)]
pub struct FetchedForecast {
    pub forecast: Forecast,
    #[serde(flatten)]
    pub source: ForecastSource,
}

impl FetchedForecast {
    pub fn is_stale(&self) -> bool {
        matches!(self.source, ForecastSource::StaleCache { .. })
    }

    /// User-facing warning for stale results
    pub fn warning(&self) -> Option<String> {
        let ForecastSource::StaleCache { reason, cached_at } = &self.source else {
            return None;
        };
        let when = cached_at.format("%H:%M UTC");
        Some(match reason {
            StaleReason::RateLimited { retry_after } => format!(
                "API rate limit reached. Showing data cached at {} (retry in {} min)",
                when,
                minutes_ceil(retry_after)
            ),
            StaleReason::BudgetLow => format!(
                "API rate limit approaching. Showing data cached at {}",
                when
            ),
            StaleReason::ProviderFailed { .. } => {
                format!("Unable to refresh weather data. Showing data cached at {}", when)
            }
        })
    }
}

fn minutes_ceil(d: &Duration) -> i64 {
    (d.num_seconds().max(0) + 59) / 60
}

fn serialize_minutes<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_i64(minutes_ceil(d))
}

/// Errors returned when no data at all is available for a city
#[derive(Debug, Error)]
pub enum FetchError {
    /// The call budget is exhausted and nothing is cached
    #[error("API rate limit reached, retry in {} min", minutes_ceil(.retry_after))]
    RateLimited { retry_after: Duration },

    /// The provider failed and nothing is cached
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl FetchError {
    pub fn is_rate_limited(&self) -> bool {
        match self {
            FetchError::RateLimited { .. } => true,
            FetchError::Provider(e) => e.status() == Some(429),
        }
    }

    /// Short message suitable for showing to the user
    pub fn user_message(&self) -> String {
        match self {
            FetchError::RateLimited { retry_after } => format!(
                "API rate limit reached. Please try again in {} minutes.",
                minutes_ceil(retry_after)
            ),
            FetchError::Provider(ProviderError::Http { status: 429, .. }) => {
                "The weather service is rate limiting requests. Please try again later.".to_string()
            }
            FetchError::Provider(ProviderError::Http {
                status: 401 | 403, ..
            })
            | FetchError::Provider(ProviderError::MissingApiKey) => {
                "Weather API key is missing or invalid.".to_string()
            }
            FetchError::Provider(ProviderError::Geocoding(GeocodeError::NotFound(city))) => {
                format!("Could not find a location named '{}'.", city)
            }
            FetchError::Provider(_) => {
                "Unable to fetch weather data. Please try again later.".to_string()
            }
        }
    }
}

#[derive(Debug)]
struct Shared {
    provider: Arc<dyn ForecastProvider>,
    enricher: Option<Arc<dyn Enricher>>,
    budget: Mutex<CallBudget>,
    cache: Mutex<ResponseCache<Forecast>>,
    refreshes: Arc<RefreshCoordinator>,
    policy: PolicyConfig,
}

/// Fetch orchestrator for city forecasts
#[derive(Debug, Clone)]
pub struct Forecaster {
    shared: Arc<Shared>,
}

impl Forecaster {
    /// Creates an orchestrator with an empty cache and a fresh call budget
    ///
    /// # Arguments
    /// * `provider` - Source of fresh forecasts
    /// * `enricher` - Optional insight generator applied to provider responses
    /// * `policy` - Budget limits and cache policy
    /// * `clock` - Time source for budget windows and cache ages
    pub fn new(
        provider: Arc<dyn ForecastProvider>,
        enricher: Option<Arc<dyn Enricher>>,
        policy: PolicyConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let budget = CallBudget::new(policy.hourly_limit, policy.daily_limit, Arc::clone(&clock));
        let cache = ResponseCache::new(
            policy.max_cache_size,
            policy.cache_ttl,
            policy.refresh_threshold,
            clock,
        );
        Self {
            shared: Arc::new(Shared {
                provider,
                enricher,
                budget: Mutex::new(budget),
                cache: Mutex::new(cache),
                refreshes: RefreshCoordinator::new(),
                policy,
            }),
        }
    }

    /// Builds the production stack: Tomorrow.io provider, optional Gemini insights, wall clock
    pub fn from_config(config: &Config) -> Self {
        let enricher = config
            .insights
            .as_ref()
            .map(|c| Arc::new(InsightClient::new(c)) as Arc<dyn Enricher>);
        Self::new(
            Arc::new(TomorrowProvider::new(&config.provider)),
            enricher,
            config.policy.clone(),
            Arc::new(SystemClock),
        )
    }

    /// Returns the forecast for `city`, from cache when fresh
    pub async fn fetch(&self, city: &str) -> Result<FetchedForecast, FetchError> {
        let key = normalize_key(city);

        if let Some(forecast) = self.serve_cached(city) {
            return Ok(FetchedForecast {
                forecast,
                source: ForecastSource::Cache,
            });
        }

        debug!(city = %key, "Cache miss");
        self.fetch_uncached(city, &key).await
    }

    /// Fresh cache entry for `city`, scheduling a background refresh when it is due
    pub fn serve_cached(&self, city: &str) -> Option<Forecast> {
        let key = normalize_key(city);
        let forecast = self.cached_fresh(&key)?;
        debug!(city = %key, "Cache hit");
        if self.shared.cache.lock().is_refresh_due(&key) {
            self.spawn_background_refresh(city);
        }
        Some(forecast)
    }

    /// Fetches `city` from the provider even when a fresh entry is cached
    ///
    /// Still subject to the call budget, and still falls back to the cache.
    pub async fn refresh(&self, city: &str) -> Result<FetchedForecast, FetchError> {
        let key = normalize_key(city);
        self.fetch_uncached(city, &key).await
    }

    async fn fetch_uncached(&self, city: &str, key: &str) -> Result<FetchedForecast, FetchError> {
        if let Some(retry_after) = self.exhausted_retry_after() {
            warn!(city = %key, retry_after_secs = retry_after.num_seconds(), "Call budget exhausted");
            return match self.cached_stale(key) {
                Some(cached) => Ok(stale(cached, StaleReason::RateLimited { retry_after })),
                None => Err(FetchError::RateLimited { retry_after }),
            };
        }

        match self.call_provider(city, key).await {
            Ok(forecast) => Ok(FetchedForecast {
                forecast,
                source: ForecastSource::Provider,
            }),
            Err(e) => {
                warn!(city = %key, error = %e, "Provider request failed");
                match self.cached_stale(key) {
                    Some(cached) => {
                        warn!(city = %key, cached_at = %cached.cached_at, "Serving stale cache");
                        Ok(stale(
                            cached,
                            StaleReason::ProviderFailed {
                                message: e.to_string(),
                            },
                        ))
                    }
                    None => Err(FetchError::Provider(e)),
                }
            }
        }
    }

    /// Calls the provider and stores a successful response
    async fn call_provider(&self, city: &str, key: &str) -> Result<Forecast, ProviderError> {
        info!(city = %key, "Fetching forecast from provider");
        let forecast = self.shared.provider.fetch_forecast(city.trim()).await?;
        self.shared.budget.lock().record_call();

        let forecast = self.enrich(forecast).await;
        self.shared.cache.lock().put(key, forecast.clone());
        Ok(forecast)
    }

    async fn enrich(&self, forecast: Forecast) -> Forecast {
        let Some(enricher) = &self.shared.enricher else {
            return forecast;
        };
        match enricher.enrich(&forecast).await {
            Ok(enriched) => enriched,
            Err(e) => {
                warn!(city = %forecast.city, error = %e, "Insight generation failed");
                forecast
            }
        }
    }

    /// Starts a detached refresh unless one is running or the budget is spent
    fn spawn_background_refresh(&self, city: &str) {
        let key = normalize_key(city);
        let city = city.trim().to_string();
        let refreshes = Arc::clone(&self.shared.refreshes);

        if self.exhausted_retry_after().is_some() {
            debug!(city = %key, "Skipping background refresh, call budget exhausted");
            refreshes.notify(RefreshMessage::Skipped {
                city,
                reason: "call budget exhausted".to_string(),
            });
            return;
        }

        let Some(guard) = refreshes.try_begin(&key) else {
            debug!(city = %key, "Background refresh already in flight");
            refreshes.notify(RefreshMessage::Skipped {
                city,
                reason: "refresh already in flight".to_string(),
            });
            return;
        };

        let this = self.clone();
        tokio::spawn(async move {
            let _guard = guard;
            // Foreground calls may have spent the budget before this task ran
            if this.exhausted_retry_after().is_some() {
                debug!(city = %key, "Dropping background refresh, call budget exhausted");
                refreshes.notify(RefreshMessage::Skipped {
                    city,
                    reason: "call budget exhausted".to_string(),
                });
                return;
            }
            refreshes.notify(RefreshMessage::Started { city: city.clone() });

            match this.call_provider(&city, &key).await {
                Ok(_) => {
                    debug!(city = %key, "Background refresh completed");
                    refreshes.notify(RefreshMessage::Completed { city });
                }
                Err(e) => {
                    warn!(city = %key, error = %e, "Background refresh failed");
                    refreshes.notify(RefreshMessage::Failed {
                        city,
                        error: e.to_string(),
                    });
                }
            }
        });
    }

    /// `Some(retry_after)` when no provider call may be made
    fn exhausted_retry_after(&self) -> Option<Duration> {
        let mut budget = self.shared.budget.lock();
        budget.has_reached_limit().then(|| budget.retry_after())
    }

    /// Fresh cache entry for `city`, bumping its recency
    pub fn cached_fresh(&self, city: &str) -> Option<Forecast> {
        let ttl = self.shared.policy.cache_ttl;
        self.shared.cache.lock().get(city, ttl)
    }

    /// Cache entry for `city` of any age, bumping its recency
    pub fn cached_stale(&self, city: &str) -> Option<CachedData<Forecast>> {
        self.shared.cache.lock().get_stale(city)
    }

    pub fn is_near_limit(&self) -> bool {
        self.shared.budget.lock().is_near_limit()
    }

    /// Current call budget state
    pub fn usage(&self) -> UsageSnapshot {
        self.shared.budget.lock().snapshot()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.shared.cache.lock().stats()
    }

    /// Drops the cached entry for `city`; returns whether one existed
    pub fn invalidate(&self, city: &str) -> bool {
        self.shared.cache.lock().invalidate(city)
    }

    /// Receives background refresh events from now on
    pub fn subscribe_refreshes(&self) -> broadcast::Receiver<RefreshMessage> {
        self.shared.refreshes.subscribe()
    }
}

fn stale(cached: CachedData<Forecast>, reason: StaleReason) -> FetchedForecast {
    FetchedForecast {
        forecast: cached.data,
        source: ForecastSource::StaleCache {
            reason,
            cached_at: cached.cached_at,
        },
    }
}
