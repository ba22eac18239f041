//! Tomorrow.io weather API client
//!
//! This module fetches timeline data (hourly and daily steps in one call) from
//! the Tomorrow.io API and transforms it into the provider-independent
//! [`Forecast`] bundle.

use std::time::Duration;

use chrono::{DateTime, FixedOffset, NaiveDate, Timelike, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::geocode::GeocodeError;
use super::{
    format_hour, AirQuality, DailyForecast, Forecast, HourlyDetail, HourlyForecast,
    WeatherCondition,
};
use crate::config::DEFAULT_PROVIDER_BASE_URL;

const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Entries in the short hourly outlook
const HOURLY_ENTRIES: usize = 5;

/// Days in the multi-day forecast
const DAILY_ENTRIES: usize = 5;

/// Local hours sampled for each day's intra-day detail
const DETAIL_HOURS: [u32; 6] = [6, 9, 12, 15, 18, 21];

/// Air quality index assumed when the provider omits it
const DEFAULT_AIR_QUALITY_INDEX: u32 = 35;

/// Fields requested from the timelines endpoint
const TIMELINE_FIELDS: [&str; 15] = [
    "temperature",
    "weatherCode",
    "humidity",
    "precipitationProbability",
    "temperatureMax",
    "temperatureMin",
    "temperatureAvg",
    "temperatureApparentAvg",
    "weatherCodeMax",
    "windSpeedAvg",
    "humidityAvg",
    "precipitationProbabilityAvg",
    "uvIndexAvg",
    "epaIndex",
    "epaHealthConcern",
];

/// Errors that can occur when fetching weather data
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider answered with a non-success status
    #[error("API error: {status} - {message}")]
    Http { status: u16, message: String },

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// Failed to parse JSON response
    #[error("Failed to parse JSON response: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Missing expected field in response
    #[error("Missing expected field in response: {0}")]
    MissingField(String),

    /// Invalid time format in response
    #[error("Invalid time format: {0}")]
    InvalidTimeFormat(String),

    /// No API key configured
    #[error("No weather API key configured (set TOMORROW_API_KEY)")]
    MissingApiKey,

    /// The city could not be resolved to coordinates
    #[error("Geocoding failed: {0}")]
    Geocoding(#[from] GeocodeError),
}

impl ProviderError {
    /// HTTP status for provider-side failures
    pub fn status(&self) -> Option<u16> {
        match self {
            ProviderError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Body of a timelines request
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TimelineRequest<'a> {
    location: &'a str,
    fields: &'a [&'a str],
    timesteps: [&'a str; 2],
    units: &'a str,
    timezone: &'a str,
    start_time: &'a str,
    end_time: &'a str,
}

/// Tomorrow.io timelines response
#[derive(Debug, Deserialize)]
struct TimelineResponse {
    data: TimelineData,
}

#[derive(Debug, Deserialize)]
struct TimelineData {
    timelines: Vec<Timeline>,
}

/// One timeline (a single timestep)
#[derive(Debug, Deserialize)]
struct Timeline {
    timestep: String,
    intervals: Vec<Interval>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Interval {
    start_time: String,
    values: IntervalValues,
}

/// Values of a timeline interval; which fields are present depends on the timestep
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IntervalValues {
    temperature: Option<f64>,
    weather_code: Option<u32>,
    humidity: Option<f64>,
    precipitation_probability: Option<f64>,
    temperature_max: Option<f64>,
    temperature_min: Option<f64>,
    temperature_avg: Option<f64>,
    temperature_apparent_avg: Option<f64>,
    weather_code_max: Option<u32>,
    wind_speed_avg: Option<f64>,
    humidity_avg: Option<f64>,
    precipitation_probability_avg: Option<f64>,
    uv_index_avg: Option<f64>,
    epa_index: Option<f64>,
    epa_health_concern: Option<f64>,
}

/// Error body returned by the provider
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Client for fetching forecasts from the Tomorrow.io API
#[derive(Debug, Clone)]
pub struct WeatherClient {
    client: Client,
    base_url: String,
    api_key: String,
    units: String,
}

impl Default for WeatherClient {
    fn default() -> Self {
        Self::new(DEFAULT_PROVIDER_BASE_URL, "")
    }
}

impl WeatherClient {
    /// Create a new WeatherClient against `base_url` using imperial units
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            units: "imperial".to_string(),
        }
    }

    /// Use `imperial` or `metric` units
    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.units = units.into();
        self
    }

    /// Fetch and transform the forecast for a location
    ///
    /// # Arguments
    /// * `location` - "lat,lon" pair or place name accepted by the provider
    /// * `city` - Display name recorded in the forecast
    /// * `full_location_name` - Optional longer name from the geocoder
    ///
    /// # Returns
    /// * `Ok(Forecast)` - Forecast with 5 hourly and 5 daily entries
    /// * `Err(ProviderError)` - If the request, status, or parsing fails
    pub async fn fetch_forecast(
        &self,
        location: &str,
        city: &str,
        full_location_name: Option<String>,
    ) -> Result<Forecast, ProviderError> {
        let response = self.fetch_timeline(location).await?;
        let mut forecast = transform_timeline(response, city, Utc::now())?;
        forecast.full_location_name = full_location_name;
        Ok(forecast)
    }

    /// POSTs a timelines request and decodes the body
    async fn fetch_timeline(&self, location: &str) -> Result<TimelineResponse, ProviderError> {
        if self.api_key.is_empty() {
            return Err(ProviderError::MissingApiKey);
        }

        let url = format!("{}/timelines", self.base_url);
        let body = TimelineRequest {
            location,
            fields: &TIMELINE_FIELDS,
            timesteps: ["1h", "1d"],
            units: &self.units,
            timezone: "auto",
            start_time: "now",
            end_time: "nowPlus5d",
        };

        tracing::info!(location, "Fetching weather timeline");
        let response = self
            .client
            .post(&url)
            .header("apikey", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&text)
                .ok()
                .and_then(|b| b.message)
                .or_else(|| status.canonical_reason().map(str::to_string))
                .unwrap_or_else(|| "Unknown error".to_string());
            return Err(ProviderError::Http {
                status: status.as_u16(),
                message,
            });
        }

        Ok(serde_json::from_str(&text)?)
    }
}

/// An interval with its parsed local start time
struct TimedValues<'a> {
    start: DateTime<FixedOffset>,
    values: &'a IntervalValues,
}

fn parse_start(start_time: &str) -> Result<DateTime<FixedOffset>, ProviderError> {
    DateTime::parse_from_rfc3339(start_time)
        .map_err(|_| ProviderError::InvalidTimeFormat(start_time.to_string()))
}

fn timed(intervals: &[Interval]) -> Result<Vec<TimedValues<'_>>, ProviderError> {
    intervals
        .iter()
        .map(|i| {
            Ok(TimedValues {
                start: parse_start(&i.start_time)?,
                values: &i.values,
            })
        })
        .collect()
}

fn round(value: f64) -> i32 {
    value.round() as i32
}

/// Label for an EPA health concern level (0-5)
fn health_concern_label(level: f64) -> &'static str {
    match level.round() as i64 {
        i64::MIN..=0 => "Good",
        1 => "Moderate",
        2 => "Unhealthy for Sensitive Groups",
        3 => "Unhealthy",
        4 => "Very Unhealthy",
        _ => "Hazardous",
    }
}

/// Transforms a timelines response into a forecast bundle
fn transform_timeline(
    response: TimelineResponse,
    city: &str,
    fetched_at: DateTime<Utc>,
) -> Result<Forecast, ProviderError> {
    let timelines = response.data.timelines;

    let hourly_timeline = timelines
        .iter()
        .find(|t| t.timestep == "1h")
        .ok_or_else(|| ProviderError::MissingField("1h timeline".to_string()))?;
    let daily_timeline = timelines
        .iter()
        .find(|t| t.timestep == "1d")
        .ok_or_else(|| ProviderError::MissingField("1d timeline".to_string()))?;

    let hours = timed(&hourly_timeline.intervals)?;
    let current = hours
        .first()
        .ok_or_else(|| ProviderError::MissingField("hourly intervals".to_string()))?;
    let temperature = current
        .values
        .temperature
        .ok_or_else(|| ProviderError::MissingField("temperature".to_string()))?;

    let hourly = hours
        .iter()
        .take(HOURLY_ENTRIES)
        .map(|h| HourlyForecast {
            hour: format_hour(h.start.hour()),
            temp: round(h.values.temperature.unwrap_or(temperature)),
            description: WeatherCondition::from_code(h.values.weather_code.unwrap_or(1000)),
        })
        .collect();

    let days = timed(&daily_timeline.intervals)?;
    let daily = days
        .iter()
        .take(DAILY_ENTRIES)
        .map(|d| daily_forecast(d, &hours))
        .collect();

    Ok(Forecast {
        city: city.to_string(),
        full_location_name: None,
        temperature: round(temperature),
        description: WeatherCondition::from_code(current.values.weather_code.unwrap_or(1000)),
        insights: None,
        hourly,
        daily,
        fetched_at,
    })
}

fn daily_forecast(day: &TimedValues<'_>, hours: &[TimedValues<'_>]) -> DailyForecast {
    let v = day.values;
    let high = v.temperature_max.or(v.temperature_avg).unwrap_or_default();
    let low = v.temperature_min.or(v.temperature_avg).unwrap_or_default();
    let avg = v.temperature_avg.unwrap_or((high + low) / 2.0);

    DailyForecast {
        day: day.start.format("%A").to_string(),
        high: round(high),
        low: round(low),
        description: WeatherCondition::from_code(v.weather_code_max.unwrap_or(1000)),
        insight: None,
        air_quality: AirQuality {
            index: v
                .epa_index
                .map(|i| i.round().max(0.0) as u32)
                .unwrap_or(DEFAULT_AIR_QUALITY_INDEX),
            description: v
                .epa_health_concern
                .map(health_concern_label)
                .unwrap_or("Moderate")
                .to_string(),
        },
        hourly_details: hourly_details(day.start.date_naive(), v, avg, hours),
        feels_like: round(v.temperature_apparent_avg.unwrap_or(avg)),
        wind_speed: round(v.wind_speed_avg.unwrap_or_default()),
        uv_index: round(v.uv_index_avg.unwrap_or_default()),
    }
}

/// Samples the hourly timeline at fixed local hours of `date`
///
/// Hours outside the hourly timeline fall back to the day's averages.
fn hourly_details(
    date: NaiveDate,
    day: &IntervalValues,
    avg_temp: f64,
    hours: &[TimedValues<'_>],
) -> Vec<HourlyDetail> {
    DETAIL_HOURS
        .iter()
        .map(|&hour| {
            let sample = hours
                .iter()
                .find(|h| h.start.date_naive() == date && h.start.hour() == hour)
                .map(|h| h.values);

            let temp = sample.and_then(|s| s.temperature).unwrap_or(avg_temp);
            let rain = sample
                .and_then(|s| s.precipitation_probability)
                .or(day.precipitation_probability_avg)
                .unwrap_or_default();
            let humidity = sample
                .and_then(|s| s.humidity)
                .or(day.humidity_avg)
                .unwrap_or(50.0);

            HourlyDetail {
                hour: format_hour(hour),
                temp: round(temp),
                rain_chance: rain.round().clamp(0.0, 100.0) as u32,
                humidity: humidity.round().clamp(0.0, 100.0) as u32,
            }
        })
        .collect()
}
