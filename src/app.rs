//! Application state management for weatherdeck
//!
//! This module contains the dashboard state: the selected cities, the latest
//! result per city, and the bookkeeping for refreshes.

use std::collections::HashMap;

use chrono::{DateTime, Local};
use serde::Serialize;
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::batch::{fetch_batch, prefetch, BatchOptions};
use crate::budget::UsageSnapshot;
use crate::cache::normalize_key;
use crate::cli::StartupConfig;
use crate::data::{GeocodeError, GeocodingClient, PlaceCandidate};
use crate::forecaster::{FetchError, FetchedForecast, Forecaster};

/// Cities shown when none are given
pub const DEFAULT_CITIES: [&str; 2] = ["Paris", "New York"];

/// Maximum number of cities on the dashboard
pub const MAX_CITIES: usize = 5;

/// Errors from editing the city list
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AppError {
    #[error("Maximum of {0} cities reached. Remove a city before adding a new one.")]
    TooManyCities(usize),

    #[error("Cannot remove the last city")]
    LastCity,

    #[error("'{0}' is not on the dashboard")]
    UnknownCity(String),

    #[error("City name must not be empty")]
    EmptyCity,
}

/// Latest state of one city on the dashboard
#[derive(Debug, Clone, Serialize)]
pub struct CityConditions {
    /// City name as shown to the user
    pub city: String,
    /// Last forecast, possibly stale
    pub fetched: Option<FetchedForecast>,
    /// Error or warning from the last load
    pub message: Option<String>,
}

/// Main application struct managing dashboard data
#[derive(Debug)]
pub struct App {
    /// Selected cities in display order
    pub cities: Vec<String>,
    /// Latest conditions keyed by normalized city name
    pub conditions: HashMap<String, CityConditions>,
    /// Provider calls made by the last load
    pub last_api_calls: usize,
    /// Timestamp of last data refresh
    pub last_refresh: Option<DateTime<Local>>,
    /// Options for batch loads
    pub batch_options: BatchOptions,
    forecaster: Forecaster,
    geocoder: GeocodingClient,
}

impl App {
    /// Creates an App showing the default cities
    pub fn new(forecaster: Forecaster, geocoder: GeocodingClient) -> Self {
        Self {
            cities: DEFAULT_CITIES.iter().map(|c| c.to_string()).collect(),
            conditions: HashMap::new(),
            last_api_calls: 0,
            last_refresh: None,
            batch_options: BatchOptions::default(),
            forecaster,
            geocoder,
        }
    }

    /// Creates an App with the cities and batch options from the command line
    ///
    /// Duplicate cities are dropped (case-insensitively) and the list is capped
    /// at [`MAX_CITIES`]. An empty list keeps the defaults.
    pub fn with_startup_config(
        forecaster: Forecaster,
        geocoder: GeocodingClient,
        config: &StartupConfig,
    ) -> Self {
        let mut app = Self::new(forecaster, geocoder);
        app.batch_options = config.batch_options;

        let mut cities: Vec<String> = Vec::new();
        for city in &config.cities {
            let city = city.trim();
            if city.is_empty() || cities.iter().any(|c| normalize_key(c) == normalize_key(city)) {
                continue;
            }
            if cities.len() == MAX_CITIES {
                tracing::warn!(city, "Too many cities, ignoring");
                continue;
            }
            cities.push(city.to_string());
        }
        if !cities.is_empty() {
            app.cities = cities;
        }

        app
    }

    pub fn city_count(&self) -> usize {
        self.cities.len()
    }

    fn position(&self, city: &str) -> Option<usize> {
        let key = normalize_key(city);
        self.cities.iter().position(|c| normalize_key(c) == key)
    }

    /// Adds a city and warms its cache entry in the background
    ///
    /// # Returns
    /// * `Ok(Some(handle))` - City added, prefetch running
    /// * `Ok(None)` - City already present, or the budget is too low to prefetch
    /// * `Err(AppError::TooManyCities)` - The dashboard is full
    /// * `Err(AppError::EmptyCity)` - The name is blank
    pub fn add_city(&mut self, city: &str) -> Result<Option<JoinHandle<()>>, AppError> {
        let city = city.trim();
        if city.is_empty() {
            return Err(AppError::EmptyCity);
        }
        if self.position(city).is_some() {
            return Ok(None);
        }
        if self.cities.len() >= MAX_CITIES {
            return Err(AppError::TooManyCities(MAX_CITIES));
        }

        self.cities.push(city.to_string());
        Ok(prefetch(&self.forecaster, vec![city.to_string()]))
    }

    /// Removes a city; the last city cannot be removed
    pub fn remove_city(&mut self, city: &str) -> Result<(), AppError> {
        let index = self
            .position(city)
            .ok_or_else(|| AppError::UnknownCity(city.to_string()))?;
        if self.cities.len() == 1 {
            return Err(AppError::LastCity);
        }

        let removed = self.cities.remove(index);
        self.conditions.remove(&normalize_key(&removed));
        Ok(())
    }

    /// Loads every selected city through a batch fetch
    pub async fn load_all_data(&mut self) {
        let mut result = fetch_batch(&self.forecaster, &self.cities, self.batch_options).await;

        for city in &self.cities {
            let conditions = CityConditions {
                city: city.clone(),
                fetched: result.data.remove(city.as_str()),
                message: result.errors.remove(city.as_str()),
            };
            self.conditions.insert(normalize_key(city), conditions);
        }

        self.last_api_calls = result.api_calls_made;
        self.last_refresh = Some(Local::now());
    }

    /// Forces a provider fetch for one city
    pub async fn refresh_city(&mut self, city: &str) -> Result<(), FetchError> {
        let index = self.position(city);
        let name = index.map_or_else(|| city.trim().to_string(), |i| self.cities[i].clone());

        let outcome = self.forecaster.refresh(&name).await;
        let conditions = match &outcome {
            Ok(fetched) => CityConditions {
                city: name.clone(),
                fetched: Some(fetched.clone()),
                message: fetched.warning(),
            },
            Err(e) => CityConditions {
                city: name.clone(),
                fetched: self
                    .conditions
                    .get(&normalize_key(&name))
                    .and_then(|c| c.fetched.clone()),
                message: Some(e.user_message()),
            },
        };
        self.conditions.insert(normalize_key(&name), conditions);
        self.last_refresh = Some(Local::now());

        outcome.map(|_| ())
    }

    /// Searches for places matching `query`
    pub async fn search(&self, query: &str) -> Result<Vec<PlaceCandidate>, GeocodeError> {
        self.geocoder.search(query).await
    }

    pub fn get_conditions(&self, city: &str) -> Option<&CityConditions> {
        self.conditions.get(&normalize_key(city))
    }

    /// Conditions for every selected city, in display order
    pub fn ordered_conditions(&self) -> Vec<&CityConditions> {
        self.cities
            .iter()
            .filter_map(|c| self.get_conditions(c))
            .collect()
    }

    pub fn usage(&self) -> UsageSnapshot {
        self.forecaster.usage()
    }

    pub fn forecaster(&self) -> &Forecaster {
        &self.forecaster
    }
}
