//! Integration tests for CLI argument handling
//!
//! Runs the weatherdeck binary with network-free configurations: the API key is
//! removed so no provider request is ever sent.

use std::process::Command;

/// Helper to run the CLI with given args and capture output
fn run_cli(args: &[&str]) -> std::process::Output {
    run_cli_with_env(args, &[])
}

fn run_cli_with_env(args: &[&str], env: &[(&str, &str)]) -> std::process::Output {
    let mut command = Command::new(env!("CARGO_BIN_EXE_weatherdeck"));
    command
        .args(args)
        .env_remove("TOMORROW_API_KEY")
        .env_remove("GEMINI_API_KEY")
        .env("TOMORROW_BASE_URL", "http://127.0.0.1:9")
        .env("GEOCODING_BASE_URL", "http://127.0.0.1:9")
        .env("RUST_LOG", "off");
    for (key, value) in env {
        command.env(key, value);
    }
    command.output().expect("Failed to execute weatherdeck")
}

#[test]
fn test_help_flag_exits_successfully() {
    let output = run_cli(&["--help"]);
    assert!(
        output.status.success(),
        "Expected --help to exit successfully"
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("weatherdeck"), "Help should mention weatherdeck");
    assert!(stdout.contains("--watch"), "Help should mention --watch flag");
    assert!(stdout.contains("--max-concurrent"));
}

#[test]
fn test_zero_max_concurrent_prints_error_and_exits() {
    let output = run_cli(&["--max-concurrent", "0"]);
    assert!(!output.status.success(), "Expected --max-concurrent 0 to fail");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("--max-concurrent"),
        "Should name the invalid flag: {}",
        stderr
    );
}

#[test]
fn test_non_numeric_watch_is_rejected_by_parser() {
    let output = run_cli(&["--watch", "soon"]);
    assert!(!output.status.success());
}

#[test]
fn test_invalid_environment_value_fails() {
    let output = run_cli_with_env(&["--usage"], &[("WEATHERDECK_HOURLY_LIMIT", "lots")]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("WEATHERDECK_HOURLY_LIMIT"), "{}", stderr);
}

#[test]
fn test_usage_reports_full_budget() {
    let output = run_cli_with_env(&["--usage"], &[("WEATHERDECK_HOURLY_LIMIT", "40")]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("40/40 calls left this hour"), "{}", stdout);
}

#[test]
fn test_usage_json_is_parseable() {
    let output = run_cli(&["--usage", "--json"]);
    assert!(output.status.success());
    let usage: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be JSON");
    assert_eq!(usage["hourly_remaining"], 25);
    assert_eq!(usage["daily_limit"], 1000);
    assert_eq!(usage["level"], "healthy");
}

#[test]
fn test_dashboard_without_api_key_shows_per_city_errors() {
    let output = run_cli(&["Paris", "Tokyo"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Paris"));
    assert!(stdout.contains("Tokyo"));
    assert!(stdout.contains("Weather API key is missing or invalid."), "{}", stdout);
    assert!(stdout.contains("25/25 calls left this hour"));
}

#[cfg(test)]
mod unit_tests {
    //! Unit tests for CLI parsing that don't require running the binary

    use clap::Parser;
    use weatherdeck::cli::{Cli, CliError, Mode, OutputFormat, StartupConfig};

    #[test]
    fn test_cli_no_args_uses_dashboard_mode() {
        let cli = Cli::parse_from(["weatherdeck"]);
        let config = StartupConfig::from_cli(&cli).unwrap();
        assert_eq!(config.mode, Mode::Dashboard);
        assert!(config.cities.is_empty());
        assert!(config.watch.is_none());
    }

    #[test]
    fn test_cli_json_and_search() {
        let cli = Cli::parse_from(["weatherdeck", "--json", "--search", "Springfield"]);
        let config = StartupConfig::from_cli(&cli).unwrap();
        assert_eq!(config.output, OutputFormat::Json);
        assert_eq!(config.mode, Mode::Search("Springfield".to_string()));
    }

    #[test]
    fn test_startup_config_rejects_zero_watch() {
        let cli = Cli::parse_from(["weatherdeck", "--watch", "0"]);
        assert_eq!(
            StartupConfig::from_cli(&cli),
            Err(CliError::InvalidWatchInterval(0))
        );
    }
}
