//! Natural-language forecast insights
//!
//! Thin client for the Gemini `generateContent` endpoint. Produces a short
//! summary for the whole forecast and a one-line insight for each of the first
//! few days. Callers treat every failure as non-fatal.

use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::InsightsConfig;
use crate::data::{DailyForecast, Forecast};

const REQUEST_TIMEOUT_SECS: u64 = 15;

/// Days that receive an individual insight
const INSIGHT_DAYS: usize = 3;

/// Errors that can occur while generating insights
#[derive(Debug, Error)]
pub enum InsightError {
    #[error("No insights API key configured")]
    MissingApiKey,

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Insights API returned HTTP {status}")]
    Http { status: u16 },

    /// The model answered without any text
    #[error("Insights API returned an empty response")]
    EmptyResponse,
}

/// Adds generated text to a forecast
#[async_trait]
pub trait Enricher: Send + Sync + std::fmt::Debug {
    /// Returns a copy of `forecast` with `insights` and per-day insights filled in
    async fn enrich(&self, forecast: &Forecast) -> Result<Forecast, InsightError>;
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate, if any
    fn text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
        let text = text.trim();
        (!text.is_empty()).then(|| text.to_string())
    }
}

/// Client for the Gemini generative-language API
#[derive(Debug, Clone)]
pub struct InsightClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl InsightClient {
    pub fn new(config: &InsightsConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        }
    }

    /// Sends a single prompt and returns the generated text
    pub async fn generate(&self, prompt: &str) -> Result<String, InsightError> {
        if self.api_key.is_empty() {
            return Err(InsightError::MissingApiKey);
        }

        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let body = GenerateRequest {
            contents: [Content {
                parts: [Part { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(InsightError::Http {
                status: response.status().as_u16(),
            });
        }

        let body: GenerateResponse = response.json().await?;
        body.text().ok_or(InsightError::EmptyResponse)
    }
}

fn summary_prompt(forecast: &Forecast) -> String {
    let mut prompt = format!(
        "Generate a concise 1-2 sentence summary of the weather for {}, where the current \
         temperature is {}°F and the current condition is {}.",
        forecast.city,
        forecast.temperature,
        forecast.description.label()
    );
    if let Some(today) = forecast.daily.first() {
        prompt.push_str(&format!(
            " The forecast high is {}°F and the low is {}°F.",
            today.high, today.low
        ));
    }
    prompt.push_str(
        " Focus on significant weather changes, temperature trends, or notable conditions. \
         Keep it direct, conversational, and useful for everyday planning.",
    );
    prompt
}

fn day_prompt(day: &DailyForecast) -> String {
    format!(
        "Generate ONE very concise insight for {} weather: high of {}°F, low of {}°F, \
         condition {}, wind speed {} mph, UV index {}. Give a single short sentence \
         (max 15 words) highlighting the most important practical aspect of the day.",
        day.day,
        day.high,
        day.low,
        day.description.label(),
        day.wind_speed,
        day.uv_index
    )
}

#[async_trait]
impl Enricher for InsightClient {
    /// The summary is required; a failed day insight only leaves that day without one.
    async fn enrich(&self, forecast: &Forecast) -> Result<Forecast, InsightError> {
        let summary = self.generate(&summary_prompt(forecast)).await?;

        let prompts: Vec<String> = forecast
            .daily
            .iter()
            .take(INSIGHT_DAYS)
            .map(day_prompt)
            .collect();
        let results = join_all(prompts.iter().map(|p| self.generate(p))).await;

        let mut enriched = forecast.clone();
        enriched.insights = Some(summary);
        for (day, result) in enriched.daily.iter_mut().zip(results) {
            match result {
                Ok(text) => day.insight = Some(text),
                Err(e) => tracing::warn!(day = %day.day, error = %e, "Day insight failed"),
            }
        }
        Ok(enriched)
    }
}
