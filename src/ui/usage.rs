//! API usage indicator and search results

use std::fmt::Write;

use crate::budget::{UsageLevel, UsageSnapshot};
use crate::data::PlaceCandidate;

fn level_marker(level: UsageLevel) -> &'static str {
    match level {
        UsageLevel::Healthy => "\u{1F7E2}",  // 🟢
        UsageLevel::Warning => "\u{1F7E1}",  // 🟡
        UsageLevel::Critical => "\u{1F534}", // 🔴
    }
}

/// Renders the remaining call budget, one line plus a warning when near the limit
pub fn render_usage(usage: &UsageSnapshot) -> String {
    let mut out = format!(
        "{} API usage: {}/{} calls left this hour, {}/{} today ({})\n",
        level_marker(usage.level),
        usage.hourly_remaining.max(0),
        usage.hourly_limit,
        usage.daily_remaining.max(0),
        usage.daily_limit,
        usage.level.label()
    );
    if usage.near_limit {
        out.push_str("  Approaching the API limit; cached data will be preferred.\n");
    }
    out
}

/// Renders numbered place candidates
pub fn render_search(query: &str, candidates: &[PlaceCandidate]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Places matching '{}':", query);
    for (i, candidate) in candidates.iter().enumerate() {
        let _ = writeln!(
            out,
            "  {}. {} ({:.4}, {:.4})",
            i + 1,
            candidate.display_name(),
            candidate.latitude,
            candidate.longitude
        );
    }
    out
}
