//! Forecast provider seam
//!
//! The orchestrator talks to the outside world only through [`ForecastProvider`],
//! which lets tests substitute an in-memory provider.

use async_trait::async_trait;

use crate::config::ProviderConfig;
use crate::data::{Forecast, GeocodingClient, ProviderError, WeatherClient};

/// Source of fresh forecasts for a city
#[async_trait]
pub trait ForecastProvider: Send + Sync + std::fmt::Debug {
    /// Fetches a new forecast; every call costs one unit of the call budget
    async fn fetch_forecast(&self, city: &str) -> Result<Forecast, ProviderError>;
}

/// Tomorrow.io provider with geocoded city lookup
#[derive(Debug, Clone)]
pub struct TomorrowProvider {
    weather: WeatherClient,
    geocoder: GeocodingClient,
}

impl TomorrowProvider {
    pub fn new(config: &ProviderConfig) -> Self {
        Self {
            weather: WeatherClient::new(&config.base_url, &config.api_key)
                .with_units(&config.units),
            geocoder: GeocodingClient::new(&config.geocoding_base_url),
        }
    }
}

#[async_trait]
impl ForecastProvider for TomorrowProvider {
    async fn fetch_forecast(&self, city: &str) -> Result<Forecast, ProviderError> {
        let coords = self.geocoder.resolve(city).await?;
        self.weather
            .fetch_forecast(&coords.as_location(), city.trim(), coords.full_name)
            .await
    }
}
