//! Plain-text dashboard rendering

use std::fmt::Write;

use chrono::Local;
use serde::Serialize;

use super::sparkline::sparkline;
use crate::app::{App, CityConditions};
use crate::budget::UsageSnapshot;
use crate::cache::CacheStats;
use crate::data::{uv_risk_level, DailyForecast, Forecast, WeatherCondition};

/// Weather condition to icon mapping
fn weather_icon(condition: &WeatherCondition) -> &'static str {
    match condition {
        WeatherCondition::Sunny => "\u{2600}",        // ☀
        WeatherCondition::PartlyCloudy => "\u{26C5}", // ⛅
        WeatherCondition::Cloudy => "\u{2601}",       // ☁
        WeatherCondition::Rainy => "\u{1F327}",       // 🌧
        WeatherCondition::Snow => "\u{2744}",         // ❄
        WeatherCondition::Thunderstorm => "\u{26C8}", // ⛈
        WeatherCondition::Foggy => "\u{1F32B}",       // 🌫
        WeatherCondition::Windy => "\u{1F32C}",       // 🌬
    }
}

/// Renders every selected city followed by a freshness and usage footer
///
/// # Arguments
/// * `app` - The application state containing loaded conditions
pub fn render_dashboard(app: &App) -> String {
    let mut out = String::new();

    for city in &app.cities {
        match app.get_conditions(city) {
            Some(conditions) => out.push_str(&render_city(conditions)),
            None => {
                let _ = writeln!(out, "{}\n  Not loaded yet", city);
            }
        }
        out.push('\n');
    }

    if let Some(last_refresh) = app.last_refresh {
        let elapsed = Local::now() - last_refresh;
        let mins_ago = elapsed.num_minutes();
        let freshness = if mins_ago < 1 {
            "just now".to_string()
        } else if mins_ago < 60 {
            format!("{}m ago", mins_ago)
        } else {
            format!("{}h ago", elapsed.num_hours())
        };
        let _ = writeln!(
            out,
            "Updated {} ({} API calls)",
            freshness, app.last_api_calls
        );
    }
    out.push_str(&super::render_usage(&app.usage()));

    out
}

#[derive(Serialize)]
struct DashboardJson<'a> {
    cities: Vec<&'a CityConditions>,
    usage: UsageSnapshot,
    cache: CacheStats,
}

/// Renders the dashboard as pretty-printed JSON
pub fn render_dashboard_json(app: &App) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&DashboardJson {
        cities: app.ordered_conditions(),
        usage: app.usage(),
        cache: app.forecaster().cache_stats(),
    })
}

/// Renders one city's block: current conditions, hourly outlook, 5-day forecast
pub fn render_city(conditions: &CityConditions) -> String {
    let mut out = String::new();

    let Some(fetched) = &conditions.fetched else {
        let _ = writeln!(out, "{}", conditions.city);
        let message = conditions.message.as_deref().unwrap_or("No data");
        let _ = writeln!(out, "  Error: {}", message);
        return out;
    };

    let forecast = &fetched.forecast;
    let _ = writeln!(
        out,
        "{}",
        forecast
            .full_location_name
            .as_deref()
            .unwrap_or(&conditions.city)
    );
    let _ = writeln!(
        out,
        "  {}° {} {}",
        forecast.temperature,
        weather_icon(&forecast.description),
        forecast.description.label()
    );
    if let Some(message) = &conditions.message {
        let _ = writeln!(out, "  ! {}", message);
    }
    if let Some(insights) = &forecast.insights {
        let _ = writeln!(out, "  {}", insights);
    }

    render_hourly(&mut out, forecast);

    if !forecast.daily.is_empty() {
        out.push_str("  Next days:\n");
        for day in &forecast.daily {
            render_day(&mut out, day);
        }
    }

    out
}

fn render_hourly(out: &mut String, forecast: &Forecast) {
    if forecast.hourly.is_empty() {
        return;
    }
    let entries: Vec<String> = forecast
        .hourly
        .iter()
        .map(|h| format!("{} {}°", h.hour, h.temp))
        .collect();
    let temps: Vec<i32> = forecast.hourly.iter().map(|h| h.temp).collect();
    let _ = writeln!(out, "  Hourly: {}  {}", entries.join(" | "), sparkline(&temps));
}

fn render_day(out: &mut String, day: &DailyForecast) {
    let _ = writeln!(
        out,
        "    {:<9} {:>4}° /{:>4}°  {} {:<13} feels {}°  wind {}  UV {} ({})  AQI {} {}",
        day.day,
        day.high,
        day.low,
        weather_icon(&day.description),
        day.description.label(),
        day.feels_like,
        day.wind_speed,
        day.uv_index,
        uv_risk_level(f64::from(day.uv_index)),
        day.air_quality.index,
        day.air_quality.description
    );
    if let Some(insight) = &day.insight {
        let _ = writeln!(out, "              {}", insight);
    }
}
