use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::collaborator::RetryPolicy;

/// Application configuration loaded from environment variables.
/// Fails at startup if a value is present but malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    /// Base URL of the structuring/suggestion service. `None` disables the
    /// collaborator-backed endpoints.
    pub collaborator_url: Option<String>,
    pub collaborator_retry: RetryPolicy,
    pub collaborator_timeout: Duration,
    /// Lock patterns applied to every new session.
    pub default_locked_paths: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let collaborator_retry = RetryPolicy {
            max_retries: env_or("COLLABORATOR_MAX_RETRIES", 3)?,
            base_delay: Duration::from_millis(env_or("COLLABORATOR_BASE_DELAY_MS", 300)?),
            max_delay: Duration::from_millis(env_or("COLLABORATOR_MAX_DELAY_MS", 2000)?),
            jitter: Duration::from_millis(env_or("COLLABORATOR_JITTER_MS", 100)?),
        };

        Ok(Config {
            port: env_or("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            collaborator_url: optional_env("COLLABORATOR_URL"),
            collaborator_retry,
            collaborator_timeout: Duration::from_secs(env_or("COLLABORATOR_TIMEOUT_SECS", 60)?),
            default_locked_paths: optional_env("DEFAULT_LOCKED_PATHS")
                .map(|raw| parse_path_list(&raw))
                .unwrap_or_default(),
        })
    }
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => parse_value(key, &raw),
        None => Ok(default),
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.parse::<T>()
        .with_context(|| format!("Environment variable '{key}' has invalid value '{raw}'"))
}

/// Comma-separated pointer patterns; blanks are skipped.
pub fn parse_path_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_path_list() {
        assert_eq!(
            parse_path_list(" /basics/name, ,/work/*/company,"),
            vec!["/basics/name", "/work/*/company"]
        );
        assert!(parse_path_list("").is_empty());
    }

    #[test]
    fn test_parse_value_reports_key() {
        let err = parse_value::<u16>("PORT", "eighty").unwrap_err();
        assert!(err.to_string().contains("PORT"));
        assert_eq!(parse_value::<u16>("PORT", "9000").unwrap(), 9000);
    }
}
