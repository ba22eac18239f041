//! Static coordinates for well-known cities
//!
//! Cities in this table resolve to coordinates without a geocoding request.

use serde::Serialize;

/// A city with known coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct City {
    /// Lowercase lookup key
    pub id: &'static str,
    /// Display name
    pub name: &'static str,
    pub latitude: f64,
    pub longitude: f64,
}

/// Static array of well-known cities
pub static CITIES: [City; 20] = [
    City { id: "new york", name: "New York", latitude: 40.7128, longitude: -74.0060 },
    City { id: "paris", name: "Paris", latitude: 48.8566, longitude: 2.3522 },
    City { id: "miami", name: "Miami", latitude: 25.7617, longitude: -80.1918 },
    City { id: "denver", name: "Denver", latitude: 39.7392, longitude: -104.9903 },
    City { id: "chicago", name: "Chicago", latitude: 41.8781, longitude: -87.6298 },
    City { id: "san francisco", name: "San Francisco", latitude: 37.7749, longitude: -122.4194 },
    City { id: "seattle", name: "Seattle", latitude: 47.6062, longitude: -122.3321 },
    City { id: "london", name: "London", latitude: 51.5074, longitude: -0.1278 },
    City { id: "tokyo", name: "Tokyo", latitude: 35.6762, longitude: 139.6503 },
    City { id: "sydney", name: "Sydney", latitude: -33.8688, longitude: 151.2093 },
    City { id: "las vegas", name: "Las Vegas", latitude: 36.1699, longitude: -115.1398 },
    City { id: "philadelphia", name: "Philadelphia", latitude: 39.9526, longitude: -75.1652 },
    City { id: "easton", name: "Easton", latitude: 40.6918, longitude: -75.2207 },
    City { id: "boston", name: "Boston", latitude: 42.3601, longitude: -71.0589 },
    City { id: "los angeles", name: "Los Angeles", latitude: 34.0522, longitude: -118.2437 },
    City { id: "austin", name: "Austin", latitude: 30.2672, longitude: -97.7431 },
    City { id: "portland", name: "Portland", latitude: 45.5152, longitude: -122.6784 },
    City { id: "atlanta", name: "Atlanta", latitude: 33.7490, longitude: -84.3880 },
    City { id: "houston", name: "Houston", latitude: 29.7604, longitude: -95.3698 },
    City { id: "dallas", name: "Dallas", latitude: 32.7767, longitude: -96.7970 },
];

/// Looks up a city by name, ignoring case and surrounding whitespace
///
/// # Example
///
/// ```
/// use weatherdeck::data::cities::known_city;
///
/// if let Some(city) = known_city("Paris") {
///     println!("{}: ({}, {})", city.name, city.latitude, city.longitude);
/// }
/// ```
pub fn known_city(name: &str) -> Option<&'static City> {
    let id = name.trim().to_lowercase();
    CITIES.iter().find(|city| city.id == id)
}

/// Get all well-known cities
pub fn all_cities() -> &'static [City] {
    &CITIES
}
