//! Application configuration loaded from environment variables.

use regex::Regex;
use std::env;
use std::str::FromStr;

use crate::error::{AppError, Result};

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of distinct snapshot versions a project may hold
    pub max_snapshot_versions: usize,

    /// POM property keys matching any of these patterns are recorded on the version
    pub property_patterns: Vec<String>,

    /// Number of versions refreshed concurrently by bulk operations
    pub refresh_concurrency: usize,

    /// Released versions kept per project when retiring old versions
    pub retain_latest_versions: usize,

    /// Capacity of the notification broadcast channel
    pub notification_capacity: usize,

    /// Log level
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_snapshot_versions: 10,
            property_patterns: vec![r"^project\..*".to_string(), r".*\.version$".to_string()],
            refresh_concurrency: 4,
            retain_latest_versions: 5,
            notification_capacity: 1024,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let config = Self {
            max_snapshot_versions: parse_var(
                "DEPOT_MAX_SNAPSHOT_VERSIONS",
                defaults.max_snapshot_versions,
            )?,
            property_patterns: match env::var("DEPOT_PROPERTY_PATTERNS") {
                Ok(raw) => split_patterns(&raw),
                Err(_) => defaults.property_patterns,
            },
            refresh_concurrency: parse_var(
                "DEPOT_REFRESH_CONCURRENCY",
                defaults.refresh_concurrency,
            )?,
            retain_latest_versions: parse_var(
                "DEPOT_RETAIN_LATEST_VERSIONS",
                defaults.retain_latest_versions,
            )?,
            notification_capacity: parse_var(
                "DEPOT_NOTIFICATION_CAPACITY",
                defaults.notification_capacity,
            )?,
            log_level: env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
        };
        config.compiled_property_patterns()?;
        Ok(config)
    }

    /// Compile the property patterns, rejecting invalid expressions.
    pub fn compiled_property_patterns(&self) -> Result<Vec<Regex>> {
        self.property_patterns
            .iter()
            .map(|p| {
                Regex::new(p).map_err(|e| {
                    AppError::Config(format!("Invalid property pattern '{}': {}", p, e))
                })
            })
            .collect()
    }
}

fn parse_var<T: FromStr>(name: &str, default: T) -> Result<T> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::Config(format!("{} must be a number, got '{}'", name, raw))),
        Err(_) => Ok(default),
    }
}

fn split_patterns(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(String::from)
        .collect()
}
