//! Command-line interface parsing for weatherdeck
//!
//! This module handles parsing of CLI arguments using clap and turns them into a
//! validated [`StartupConfig`].

use std::time::Duration;

use clap::Parser;
use thiserror::Error;

use crate::batch::BatchOptions;

/// Error types for CLI argument validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CliError {
    #[error("Invalid --max-concurrent value: {0}. Must be at least 1")]
    InvalidConcurrency(usize),

    #[error("Invalid --watch interval: {0} seconds. Must be at least 1")]
    InvalidWatchInterval(u64),

    #[error("Search query must not be empty")]
    EmptySearch,
}

/// weatherdeck - Weather dashboard for a handful of cities
#[derive(Parser, Debug)]
#[command(name = "weatherdeck")]
#[command(about = "Terminal weather dashboard with cached, rate-limited forecasts")]
#[command(version)]
pub struct Cli {
    /// Cities to show (default: Paris, New York)
    ///
    /// Examples:
    ///   weatherdeck                      # Paris and New York
    ///   weatherdeck Tokyo "San Francisco"
    #[arg(value_name = "CITY")]
    pub cities: Vec<String>,

    /// Search for places matching a name and print the candidates
    #[arg(long, value_name = "QUERY")]
    pub search: Option<String>,

    /// Print results as JSON instead of text
    #[arg(long)]
    pub json: bool,

    /// Add generated insights (requires GEMINI_API_KEY)
    #[arg(long)]
    pub insights: bool,

    /// Keep running and reload every SECONDS
    #[arg(long, value_name = "SECONDS")]
    pub watch: Option<u64>,

    /// Maximum concurrent provider requests
    #[arg(long, value_name = "N", default_value_t = 3)]
    pub max_concurrent: usize,

    /// Fetch from the provider even when cached data is fresh
    #[arg(long)]
    pub force_refresh: bool,

    /// Print API usage and exit without fetching
    #[arg(long)]
    pub usage: bool,
}

/// Output format for results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// What the binary should do once started
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Mode {
    /// Load the dashboard (once, or repeatedly with `watch`)
    #[default]
    Dashboard,
    /// Print place candidates for a query
    Search(String),
    /// Print the call budget snapshot
    Usage,
}

/// Configuration derived from CLI arguments for application startup
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StartupConfig {
    pub mode: Mode,
    /// Cities given on the command line; empty means the defaults
    pub cities: Vec<String>,
    pub batch_options: BatchOptions,
    pub output: OutputFormat,
    pub insights: bool,
    /// Reload interval for watch mode
    pub watch: Option<Duration>,
}

impl StartupConfig {
    /// Creates a StartupConfig from parsed CLI arguments.
    ///
    /// # Arguments
    /// * `cli` - The parsed CLI struct
    ///
    /// # Returns
    /// * `Ok(StartupConfig)` with appropriate settings
    /// * `Err(CliError)` if a value is out of range
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        if cli.max_concurrent == 0 {
            return Err(CliError::InvalidConcurrency(cli.max_concurrent));
        }
        let watch = match cli.watch {
            Some(0) => return Err(CliError::InvalidWatchInterval(0)),
            Some(secs) => Some(Duration::from_secs(secs)),
            None => None,
        };

        let mode = match (&cli.search, cli.usage) {
            (Some(query), _) if query.trim().is_empty() => return Err(CliError::EmptySearch),
            (Some(query), _) => Mode::Search(query.trim().to_string()),
            (None, true) => Mode::Usage,
            (None, false) => Mode::Dashboard,
        };

        Ok(StartupConfig {
            mode,
            cities: cli.cities.clone(),
            batch_options: BatchOptions {
                max_concurrent: cli.max_concurrent,
                force_refresh: cli.force_refresh,
                ..BatchOptions::default()
            },
            output: if cli.json {
                OutputFormat::Json
            } else {
                OutputFormat::Text
            },
            insights: cli.insights,
            watch,
        })
    }
}
