//! Environment-style configuration
//!
//! All options are optional and fall back to documented defaults. Values are
//! read through a lookup function so tests never touch the process environment.

use chrono::Duration;
use thiserror::Error;

/// Default Tomorrow.io API base URL
pub const DEFAULT_PROVIDER_BASE_URL: &str = "https://api.tomorrow.io/v4";

/// Default Open-Meteo geocoding base URL
pub const DEFAULT_GEOCODING_BASE_URL: &str = "https://geocoding-api.open-meteo.com/v1";

/// Default generative-language API base URL
pub const DEFAULT_INSIGHTS_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default generative model
pub const DEFAULT_INSIGHTS_MODEL: &str = "gemini-pro";

/// Provider calls allowed per hour
pub const DEFAULT_HOURLY_LIMIT: i64 = 25;

/// Provider calls allowed per day
pub const DEFAULT_DAILY_LIMIT: i64 = 1000;

/// Standard cache TTL in minutes
pub const DEFAULT_CACHE_TTL_MINUTES: i64 = 30;

/// Age in minutes after which a cached forecast is refreshed in the background
pub const DEFAULT_REFRESH_THRESHOLD_MINUTES: i64 = 20;

/// Maximum number of cached cities
pub const DEFAULT_MAX_CACHE_SIZE: usize = 10;

/// Errors raised while reading configuration
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable was set but could not be parsed
    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: &'static str, value: String },

    /// The refresh threshold must be shorter than the cache TTL
    #[error("Refresh threshold ({threshold_minutes} min) must be shorter than cache TTL ({ttl_minutes} min)")]
    InvalidWindow {
        threshold_minutes: i64,
        ttl_minutes: i64,
    },
}

/// Settings for the weather provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub api_key: String,
    pub base_url: String,
    /// `imperial` or `metric`
    pub units: String,
    pub geocoding_base_url: String,
}

/// Settings for the optional insight generator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsightsConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

/// Call budget and cache policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyConfig {
    pub hourly_limit: i64,
    pub daily_limit: i64,
    pub cache_ttl: Duration,
    pub refresh_threshold: Duration,
    pub max_cache_size: usize,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            hourly_limit: DEFAULT_HOURLY_LIMIT,
            daily_limit: DEFAULT_DAILY_LIMIT,
            cache_ttl: Duration::minutes(DEFAULT_CACHE_TTL_MINUTES),
            refresh_threshold: Duration::minutes(DEFAULT_REFRESH_THRESHOLD_MINUTES),
            max_cache_size: DEFAULT_MAX_CACHE_SIZE,
        }
    }
}

/// Complete application configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub provider: ProviderConfig,
    /// `None` disables insight generation
    pub insights: Option<InsightsConfig>,
    pub policy: PolicyConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: ProviderConfig {
                api_key: String::new(),
                base_url: DEFAULT_PROVIDER_BASE_URL.to_string(),
                units: "imperial".to_string(),
                geocoding_base_url: DEFAULT_GEOCODING_BASE_URL.to_string(),
            },
            insights: None,
            policy: PolicyConfig::default(),
        }
    }
}

impl Config {
    /// Reads configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through an arbitrary variable lookup
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Config::default();

        let provider = ProviderConfig {
            api_key: get("TOMORROW_API_KEY").unwrap_or_default(),
            base_url: get("TOMORROW_BASE_URL").unwrap_or(defaults.provider.base_url),
            units: get("WEATHERDECK_UNITS").unwrap_or(defaults.provider.units),
            geocoding_base_url: get("GEOCODING_BASE_URL")
                .unwrap_or(defaults.provider.geocoding_base_url),
        };

        let insights = get("GEMINI_API_KEY").map(|api_key| InsightsConfig {
            api_key,
            base_url: get("GEMINI_BASE_URL").unwrap_or_else(|| DEFAULT_INSIGHTS_BASE_URL.to_string()),
            model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_INSIGHTS_MODEL.to_string()),
        });

        let (ttl_minutes, cache_ttl) =
            parse_minutes(&get, "WEATHERDECK_CACHE_TTL_MINUTES", DEFAULT_CACHE_TTL_MINUTES)?;
        let (threshold_minutes, refresh_threshold) = parse_minutes(
            &get,
            "WEATHERDECK_REFRESH_THRESHOLD_MINUTES",
            DEFAULT_REFRESH_THRESHOLD_MINUTES,
        )?;
        if threshold_minutes >= ttl_minutes {
            return Err(ConfigError::InvalidWindow {
                threshold_minutes,
                ttl_minutes,
            });
        }

        let max_cache_size =
            parse_number(&get, "WEATHERDECK_MAX_CACHE_SIZE", DEFAULT_MAX_CACHE_SIZE)?;
        if max_cache_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "WEATHERDECK_MAX_CACHE_SIZE",
                value: max_cache_size.to_string(),
            });
        }

        let policy = PolicyConfig {
            hourly_limit: parse_number(&get, "WEATHERDECK_HOURLY_LIMIT", DEFAULT_HOURLY_LIMIT)?,
            daily_limit: parse_number(&get, "WEATHERDECK_DAILY_LIMIT", DEFAULT_DAILY_LIMIT)?,
            cache_ttl,
            refresh_threshold,
            max_cache_size,
        };

        Ok(Self {
            provider,
            insights,
            policy,
        })
    }
}

/// Parses a minute count that fits in a [`Duration`]
fn parse_minutes<G>(get: &G, key: &'static str, default: i64) -> Result<(i64, Duration), ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    let minutes = parse_number(get, key, default)?;
    let duration = Duration::try_minutes(minutes).ok_or_else(|| ConfigError::InvalidValue {
        key,
        value: minutes.to_string(),
    })?;
    Ok((minutes, duration))
}

/// Parses a non-negative number, falling back to `default` when unset
fn parse_number<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialOrd + Default,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(default),
        Some(raw) => match raw.trim().parse::<T>() {
            Ok(value) if value >= T::default() => Ok(value),
            _ => Err(ConfigError::InvalidValue { key, value: raw }),
        },
    }
}
