//! Core data models for the weather dashboard
//!
//! This module contains the provider-independent forecast bundle and the
//! collaborators that produce it: the static city table, the geocoding client,
//! and the weather provider client.

pub mod cities;
pub mod geocode;
pub mod weather;

pub use cities::{all_cities, known_city, City};
pub use geocode::{Coordinates, GeocodeError, GeocodingClient, PlaceCandidate};
pub use weather::{ProviderError, WeatherClient};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Weather condition categories mapped from Tomorrow.io weather codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum WeatherCondition {
    Sunny,
    #[default]
    PartlyCloudy,
    Cloudy,
    Rainy,
    Snow,
    Thunderstorm,
    Foggy,
    Windy,
}

impl WeatherCondition {
    /// Maps a Tomorrow.io weather code to a condition
    ///
    /// Codes: <https://docs.tomorrow.io/reference/data-core-weather-codes>.
    /// Unlisted codes fall back by family (4xxx rain, 5xxx snow, 6xxx wind),
    /// anything else is partly cloudy.
    pub fn from_code(code: u32) -> Self {
        match code {
            1000 => Self::Sunny,
            1100 | 1101 | 1102 => Self::PartlyCloudy,
            1001 | 1103 => Self::Cloudy,
            4000 | 4001 | 4200 | 4201 | 4203 | 4204 | 4205 | 4213 | 4214 | 4215 => Self::Rainy,
            5000 | 5001 | 5100 | 5101 | 5103 | 5104 | 5105 | 5106 | 5107 | 5115 | 5116
            | 5117 => Self::Snow,
            8000 | 8001 | 8003 => Self::Thunderstorm,
            2000 | 2100 => Self::Foggy,
            6000 | 6001 | 6002 | 6003 | 6004 | 7102 => Self::Windy,
            4000..=4999 => Self::Rainy,
            5000..=5999 => Self::Snow,
            6000..=6999 => Self::Windy,
            _ => Self::PartlyCloudy,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Sunny => "Sunny",
            Self::PartlyCloudy => "Partly Cloudy",
            Self::Cloudy => "Cloudy",
            Self::Rainy => "Rainy",
            Self::Snow => "Snow",
            Self::Thunderstorm => "Thunderstorm",
            Self::Foggy => "Foggy",
            Self::Windy => "Windy",
        }
    }
}

/// UV risk category for a UV index
pub fn uv_risk_level(uv_index: f64) -> &'static str {
    if uv_index < 3.0 {
        "Low"
    } else if uv_index < 6.0 {
        "Moderate"
    } else if uv_index < 8.0 {
        "High"
    } else if uv_index < 11.0 {
        "Very High"
    } else {
        "Extreme"
    }
}

/// Formats an hour of day as a 12-hour label, e.g. "10 AM", "12 PM"
pub fn format_hour(hour: u32) -> String {
    let suffix = if hour >= 12 { "PM" } else { "AM" };
    let display = match hour % 12 {
        0 => 12,
        h => h,
    };
    format!("{} {}", display, suffix)
}

/// A single entry in the short hourly outlook
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyForecast {
    /// Hour label, e.g. "3 PM"
    pub hour: String,
    /// Temperature, rounded
    pub temp: i32,
    pub description: WeatherCondition,
}

/// Air quality for a day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirQuality {
    /// EPA air quality index
    pub index: u32,
    /// EPA health concern label
    pub description: String,
}

/// Intra-day detail for a forecast day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyDetail {
    pub hour: String,
    pub temp: i32,
    /// Precipitation probability percentage (0-100)
    pub rain_chance: u32,
    /// Relative humidity percentage (0-100)
    pub humidity: u32,
}

/// One day of the multi-day forecast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyForecast {
    /// Weekday name, e.g. "Monday"
    pub day: String,
    pub high: i32,
    pub low: i32,
    pub description: WeatherCondition,
    /// Generated one-line insight, when enrichment ran
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insight: Option<String>,
    pub air_quality: AirQuality,
    pub hourly_details: Vec<HourlyDetail>,
    pub feels_like: i32,
    pub wind_speed: i32,
    pub uv_index: i32,
}

/// Provider-independent forecast bundle for one city
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub city: String,
    /// Full location name, e.g. "Paris, Île-de-France, France"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_location_name: Option<String>,
    /// Current temperature, rounded
    pub temperature: i32,
    pub description: WeatherCondition,
    /// Generated summary, when enrichment ran
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insights: Option<String>,
    pub hourly: Vec<HourlyForecast>,
    pub daily: Vec<DailyForecast>,
    /// When the provider data was fetched
    pub fetched_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weather_code_mapping() {
        assert_eq!(WeatherCondition::from_code(1000), WeatherCondition::Sunny);

        assert_eq!(WeatherCondition::from_code(1100), WeatherCondition::PartlyCloudy);
        assert_eq!(WeatherCondition::from_code(1102), WeatherCondition::PartlyCloudy);

        assert_eq!(WeatherCondition::from_code(1001), WeatherCondition::Cloudy);
        assert_eq!(WeatherCondition::from_code(1103), WeatherCondition::Cloudy);

        assert_eq!(WeatherCondition::from_code(4001), WeatherCondition::Rainy);
        assert_eq!(WeatherCondition::from_code(4215), WeatherCondition::Rainy);

        assert_eq!(WeatherCondition::from_code(5100), WeatherCondition::Snow);
        assert_eq!(WeatherCondition::from_code(5117), WeatherCondition::Snow);

        assert_eq!(WeatherCondition::from_code(8000), WeatherCondition::Thunderstorm);

        assert_eq!(WeatherCondition::from_code(2000), WeatherCondition::Foggy);
        assert_eq!(WeatherCondition::from_code(2100), WeatherCondition::Foggy);

        assert_eq!(WeatherCondition::from_code(6001), WeatherCondition::Windy);
        assert_eq!(WeatherCondition::from_code(7102), WeatherCondition::Windy);
    }

    #[test]
    fn test_weather_code_family_fallbacks() {
        assert_eq!(WeatherCondition::from_code(4999), WeatherCondition::Rainy);
        assert_eq!(WeatherCondition::from_code(5500), WeatherCondition::Snow);
        assert_eq!(WeatherCondition::from_code(6200), WeatherCondition::Windy);
        // Unknown codes default to PartlyCloudy
        assert_eq!(WeatherCondition::from_code(0), WeatherCondition::PartlyCloudy);
        assert_eq!(WeatherCondition::from_code(7000), WeatherCondition::PartlyCloudy);
        assert_eq!(WeatherCondition::from_code(9999), WeatherCondition::PartlyCloudy);
    }

    #[test]
    fn test_condition_serializes_kebab_case() {
        let json = serde_json::to_string(&WeatherCondition::PartlyCloudy).unwrap();
        assert_eq!(json, "\"partly-cloudy\"");
    }

    #[test]
    fn test_uv_risk_levels() {
        assert_eq!(uv_risk_level(0.0), "Low");
        assert_eq!(uv_risk_level(2.9), "Low");
        assert_eq!(uv_risk_level(3.0), "Moderate");
        assert_eq!(uv_risk_level(6.0), "High");
        assert_eq!(uv_risk_level(8.0), "Very High");
        assert_eq!(uv_risk_level(11.0), "Extreme");
    }

    #[test]
    fn test_format_hour() {
        assert_eq!(format_hour(0), "12 AM");
        assert_eq!(format_hour(6), "6 AM");
        assert_eq!(format_hour(12), "12 PM");
        assert_eq!(format_hour(15), "3 PM");
        assert_eq!(format_hour(23), "11 PM");
    }

    #[test]
    fn test_forecast_omits_missing_insights() {
        let forecast = Forecast {
            city: "Paris".to_string(),
            full_location_name: None,
            temperature: 64,
            description: WeatherCondition::Sunny,
            insights: None,
            hourly: Vec::new(),
            daily: Vec::new(),
            fetched_at: Utc::now(),
        };

        let json = serde_json::to_string(&forecast).unwrap();

        assert!(!json.contains("insights"));
        assert!(json.contains("\"description\":\"sunny\""));
    }
}
