use std::path::PathBuf;

use crate::app_config::{AppConfig, DEFAULT_USER_AGENT};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but cannot be parsed, or fails
/// a range check.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but cannot be parsed, or fails
/// a range check.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so tests can drive it with a plain
/// `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let optional_path = |var: &str| -> Option<PathBuf> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .trim()
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .trim()
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .trim()
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_bool = |var: &str, default: &str| -> Result<bool, ConfigError> {
        let raw = or_default(var, default);
        parse_flag(&raw).ok_or_else(|| invalid(var, format!("expected a boolean, got '{raw}'")))
    };

    let search_url = or_default("HARVEST_SEARCH_URL", "https://www.olx.in/items/q-car-cover");
    if !(search_url.starts_with("http://") || search_url.starts_with("https://")) {
        return Err(invalid(
            "HARVEST_SEARCH_URL",
            format!("'{search_url}' is not an absolute http(s) URL"),
        ));
    }
    let search_query = or_default("HARVEST_SEARCH_QUERY", "car cover");
    let log_level = or_default("HARVEST_LOG_LEVEL", "info");
    let output_path = PathBuf::from(or_default(
        "HARVEST_OUTPUT_PATH",
        "results/car_covers_results.json",
    ));
    let selectors_path = optional_path("HARVEST_SELECTORS_PATH");

    let request_delay_ms = parse_u64("HARVEST_REQUEST_DELAY_MS", "2000")?;
    let max_attempts = parse_u32("HARVEST_MAX_ATTEMPTS", "3")?;
    if max_attempts == 0 {
        return Err(invalid(
            "HARVEST_MAX_ATTEMPTS",
            "must be at least 1".to_string(),
        ));
    }
    let request_timeout_secs = parse_u64("HARVEST_REQUEST_TIMEOUT_SECS", "30")?;
    let max_backoff_ms = parse_u64("HARVEST_MAX_BACKOFF_MS", "30000")?;
    let jitter_max_ms = parse_u64("HARVEST_JITTER_MAX_MS", "750")?;
    let user_agent = or_default("HARVEST_USER_AGENT", DEFAULT_USER_AGENT);

    let max_pages = parse_u32("HARVEST_MAX_PAGES", "3")?;
    if max_pages == 0 {
        return Err(invalid("HARVEST_MAX_PAGES", "must be at least 1".to_string()));
    }
    let expected_per_page = parse_usize("HARVEST_EXPECTED_PER_PAGE", "40")?;

    let browser_enabled = parse_bool("HARVEST_BROWSER_ENABLED", "true")?;
    let chrome_path = optional_path("HARVEST_CHROME_PATH");
    let browser_timeout_secs = parse_u64("HARVEST_BROWSER_TIMEOUT_SECS", "30")?;
    let browser_settle_ms = parse_u64("HARVEST_BROWSER_SETTLE_MS", "2000")?;

    Ok(AppConfig {
        search_url,
        search_query,
        log_level,
        output_path,
        selectors_path,
        request_delay_ms,
        max_attempts,
        request_timeout_secs,
        max_backoff_ms,
        jitter_max_ms,
        user_agent,
        max_pages,
        expected_per_page,
        browser_enabled,
        chrome_path,
        browser_timeout_secs,
        browser_settle_ms,
    })
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
