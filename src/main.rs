//! weatherdeck - Terminal weather dashboard
//!
//! Shows current conditions, an hourly outlook and a 5-day forecast for a few
//! cities, keeping provider calls inside an hourly and daily budget.

use std::process;

use clap::Parser;
use tracing::{info, warn};

use weatherdeck::app::App;
use weatherdeck::cli::{Cli, Mode, OutputFormat, StartupConfig};
use weatherdeck::config::Config;
use weatherdeck::data::GeocodingClient;
use weatherdeck::forecaster::Forecaster;
use weatherdeck::refresh::RefreshMessage;
use weatherdeck::ui;

/// Logs go to stderr so `--json` output on stdout stays parseable
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Prints the dashboard in the requested format
fn print_dashboard(app: &App, output: OutputFormat) -> Result<(), serde_json::Error> {
    match output {
        OutputFormat::Text => print!("{}", ui::render_dashboard(app)),
        OutputFormat::Json => println!("{}", ui::render_dashboard_json(app)?),
    }
    Ok(())
}

/// Reloads every `interval` until Ctrl-C
async fn watch(
    app: &mut App,
    startup: &StartupConfig,
    interval: std::time::Duration,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut refreshes = app.forecaster().subscribe_refreshes();
    let mut ticker = tokio::time::interval(interval);
    // Skip the first tick (immediate)
    ticker.tick().await;
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                app.load_all_data().await;
                if startup.output == OutputFormat::Text {
                    println!("{}", "-".repeat(60));
                }
                print_dashboard(app, startup.output)?;
            }
            message = refreshes.recv() => {
                match message {
                    Ok(RefreshMessage::Failed { city, error }) => {
                        warn!(city = %city, error = %error, "Background refresh failed");
                    }
                    Ok(message) => info!(?message, "Background refresh"),
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Missed background refresh events");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
            _ = &mut shutdown => break,
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let startup = match StartupConfig::from_cli(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(2);
        }
    };

    init_tracing();

    let mut config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(2);
        }
    };
    if !startup.insights {
        config.insights = None;
    } else if config.insights.is_none() {
        warn!("--insights requested but GEMINI_API_KEY is not set");
    }

    let forecaster = Forecaster::from_config(&config);
    let geocoder = GeocodingClient::new(&config.provider.geocoding_base_url);
    let mut app = App::with_startup_config(forecaster, geocoder, &startup);

    match &startup.mode {
        Mode::Usage => match startup.output {
            OutputFormat::Text => print!("{}", ui::render_usage(&app.usage())),
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&app.usage())?),
        },
        Mode::Search(query) => {
            let candidates = match app.search(query).await {
                Ok(candidates) => candidates,
                Err(e) => {
                    eprintln!("error: {}", e);
                    process::exit(1);
                }
            };
            match startup.output {
                OutputFormat::Text => print!("{}", ui::render_search(query, &candidates)),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&candidates)?),
            }
        }
        Mode::Dashboard => {
            app.load_all_data().await;
            print_dashboard(&app, startup.output)?;

            if let Some(interval) = startup.watch {
                watch(&mut app, &startup, interval).await?;
            }
        }
    }

    Ok(())
}
