//! Geocoding: resolve free-text place names to coordinates
//!
//! Uses the Open-Meteo geocoding API (no API key required). Well-known cities
//! are resolved from the static table without a request.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::cities::known_city;
use crate::config::DEFAULT_GEOCODING_BASE_URL;

const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Number of candidates requested per search
const MAX_CANDIDATES: u32 = 5;

/// Errors that can occur while resolving a place name
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// No place matched the query
    #[error("No location found for '{0}'")]
    NotFound(String),

    /// HTTP request failed
    #[error("Geocoding request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// The service answered with a non-success status
    #[error("Geocoding service returned HTTP {status}")]
    Http { status: u16 },
}

/// A place matching a search query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaceCandidate {
    pub name: String,
    pub country: Option<String>,
    /// First-level administrative region (state, province)
    pub region: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
}

impl PlaceCandidate {
    /// "Name, Region, Country" with missing or repeated parts skipped
    pub fn display_name(&self) -> String {
        let mut parts: Vec<&str> = vec![self.name.as_str()];
        for part in [self.region.as_deref(), self.country.as_deref()]
            .into_iter()
            .flatten()
        {
            if !part.is_empty() && !parts.contains(&part) {
                parts.push(part);
            }
        }
        parts.join(", ")
    }
}

/// Resolved location of a city
#[derive(Debug, Clone, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
    /// Full location name when it came from the geocoder
    pub full_name: Option<String>,
}

impl Coordinates {
    /// Location string in the "lat,lon" form the weather provider expects
    pub fn as_location(&self) -> String {
        format!("{},{}", self.latitude, self.longitude)
    }
}

/// Open-Meteo geocoding response
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    name: String,
    latitude: f64,
    longitude: f64,
    country: Option<String>,
    admin1: Option<String>,
}

/// Client for the geocoding API
#[derive(Debug, Clone)]
pub struct GeocodingClient {
    client: Client,
    base_url: String,
}

impl Default for GeocodingClient {
    fn default() -> Self {
        Self::new(DEFAULT_GEOCODING_BASE_URL)
    }
}

impl GeocodingClient {
    /// Creates a client against `base_url` (e.g. `https://geocoding-api.open-meteo.com/v1`)
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Searches for places matching `query`
    ///
    /// # Returns
    /// * `Ok(Vec<PlaceCandidate>)` - At least one candidate, best match first
    /// * `Err(GeocodeError::NotFound)` - Nothing matched
    pub async fn search(&self, query: &str) -> Result<Vec<PlaceCandidate>, GeocodeError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(GeocodeError::NotFound(String::new()));
        }

        let url = format!("{}/search", self.base_url);
        let count = MAX_CANDIDATES.to_string();
        let response = self
            .client
            .get(&url)
            .query(&[
                ("name", query),
                ("count", count.as_str()),
                ("language", "en"),
                ("format", "json"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GeocodeError::Http {
                status: response.status().as_u16(),
            });
        }

        let body: SearchResponse = response.json().await?;
        let candidates: Vec<PlaceCandidate> = body
            .results
            .into_iter()
            .map(|r| PlaceCandidate {
                name: r.name,
                country: r.country,
                region: r.admin1,
                latitude: r.latitude,
                longitude: r.longitude,
            })
            .collect();

        if candidates.is_empty() {
            return Err(GeocodeError::NotFound(query.to_string()));
        }

        tracing::debug!(query, matches = candidates.len(), "Geocoded place name");
        Ok(candidates)
    }

    /// Resolves a city name to coordinates
    ///
    /// Well-known cities come from the static table; anything else takes the
    /// best geocoder match.
    pub async fn resolve(&self, city: &str) -> Result<Coordinates, GeocodeError> {
        if let Some(known) = known_city(city) {
            return Ok(Coordinates {
                latitude: known.latitude,
                longitude: known.longitude,
                full_name: None,
            });
        }

        let best = self
            .search(city)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| GeocodeError::NotFound(city.to_string()))?;

        Ok(Coordinates {
            latitude: best.latitude,
            longitude: best.longitude,
            full_name: Some(best.display_name()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_search_returns_candidates() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("name", "Springfield"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [
                    {"name": "Springfield", "latitude": 39.80, "longitude": -89.64,
                     "country": "United States", "admin1": "Illinois"},
                    {"name": "Springfield", "latitude": 37.21, "longitude": -93.29,
                     "country": "United States", "admin1": "Missouri"}
                ],
                "generationtime_ms": 0.5
            })))
            .mount(&mock_server)
            .await;

        let client = GeocodingClient::new(mock_server.uri());
        let candidates = client.search("Springfield").await.unwrap();

        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].region.as_deref(), Some("Illinois"));
        assert_eq!(
            candidates[1].display_name(),
            "Springfield, Missouri, United States"
        );
    }

    #[tokio::test]
    async fn test_search_without_results_is_not_found() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"generationtime_ms": 0.3})),
            )
            .mount(&mock_server)
            .await;

        let client = GeocodingClient::new(mock_server.uri());
        let err = client.search("Qwertyville").await.unwrap_err();

        assert!(matches!(err, GeocodeError::NotFound(ref q) if q == "Qwertyville"));
    }

    #[tokio::test]
    async fn test_search_http_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;

        let client = GeocodingClient::new(mock_server.uri());
        let err = client.search("Paris").await.unwrap_err();

        assert!(matches!(err, GeocodeError::Http { status: 503 }));
    }

    #[tokio::test]
    async fn test_resolve_known_city_skips_network() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&mock_server)
            .await;

        let client = GeocodingClient::new(mock_server.uri());
        let coords = client.resolve("Tokyo").await.unwrap();

        assert!((coords.latitude - 35.6762).abs() < 0.0001);
        assert!(coords.full_name.is_none());
    }

    #[tokio::test]
    async fn test_resolve_unknown_city_uses_best_match() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [
                    {"name": "Reykjavik", "latitude": 64.14, "longitude": -21.94,
                     "country": "Iceland", "admin1": "Capital Region"}
                ]
            })))
            .mount(&mock_server)
            .await;

        let client = GeocodingClient::new(mock_server.uri());
        let coords = client.resolve("reykjavik").await.unwrap();

        assert_eq!(coords.as_location(), "64.14,-21.94");
        assert_eq!(
            coords.full_name.as_deref(),
            Some("Reykjavik, Capital Region, Iceland")
        );
    }

    #[tokio::test]
    async fn test_empty_query_is_not_found() {
        let client = GeocodingClient::default();
        let err = client.search("   ").await.unwrap_err();
        assert!(matches!(err, GeocodeError::NotFound(_)));
    }

    #[test]
    fn test_display_name_skips_duplicate_parts() {
        let candidate = PlaceCandidate {
            name: "Singapore".to_string(),
            country: Some("Singapore".to_string()),
            region: None,
            latitude: 1.29,
            longitude: 103.85,
        };

        assert_eq!(candidate.display_name(), "Singapore");
    }
}
