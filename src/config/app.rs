//! Main application configuration
//!
//! Loads service, rating and replay settings from environment variables or a
//! TOML file, with validation and defaults.

use crate::config::rating::RatingConstants;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::str::FromStr;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceSettings,
    pub rating: RatingConstants,
    pub replay: ReplaySettings,
}

/// Service-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Service name for logging and metrics
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

/// Replay orchestration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplaySettings {
    /// Maximum number of rating scopes rebuilt at the same time
    pub max_concurrent_scopes: usize,
    /// Sort incoming histories by timestamp before replaying
    pub sort_input: bool,
    /// Log progress every N matches (0 disables progress logging)
    pub progress_interval: usize,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "alliance-rating".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl Default for ReplaySettings {
    fn default() -> Self {
        Self {
            max_concurrent_scopes: 4,
            sort_input: true,
            progress_interval: 1000,
        }
    }
}

fn parse_var<T: FromStr>(name: &str, target: &mut T) -> Result<()> {
    if let Ok(raw) = env::var(name) {
        *target = raw
            .parse()
            .map_err(|_| anyhow!("Invalid {} value: {}", name, raw))?;
    }
    Ok(())
}

impl AppConfig {
    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        // Service settings
        if let Ok(name) = env::var("SERVICE_NAME") {
            config.service.name = name;
        }
        if let Ok(log_level) = env::var("LOG_LEVEL") {
            config.service.log_level = log_level;
        }

        // Rating constants
        parse_var("RATING_K", &mut config.rating.k)?;
        parse_var("RATING_W", &mut config.rating.w)?;
        parse_var("RATING_U_MATCH", &mut config.rating.u_match)?;
        parse_var("RATING_U_MIN", &mut config.rating.u_min)?;
        parse_var("RATING_INITIAL_RATING", &mut config.rating.initial_rating)?;
        parse_var(
            "RATING_INITIAL_UNCERTAINTY",
            &mut config.rating.initial_uncertainty,
        )?;
        parse_var(
            "RATING_REGIME_CHANGE_THRESHOLD",
            &mut config.rating.regime_change_threshold,
        )?;

        // Replay settings
        parse_var(
            "REPLAY_MAX_CONCURRENT_SCOPES",
            &mut config.replay.max_concurrent_scopes,
        )?;
        parse_var("REPLAY_SORT_INPUT", &mut config.replay.sort_input)?;
        parse_var(
            "REPLAY_PROGRESS_INTERVAL",
            &mut config.replay.progress_interval,
        )?;

        validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML file; missing keys keep their defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: AppConfig = toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        validate_config(&config)?;
        Ok(config)
    }
}

/// Validate configuration values
pub fn validate_config(config: &AppConfig) -> Result<()> {
    // Validate log level
    match config.service.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(anyhow!("Invalid log level: {}", config.service.log_level)),
    }

    if config.service.name.is_empty() {
        return Err(anyhow!("Service name cannot be empty"));
    }

    config.rating.validate()?;

    if config.replay.max_concurrent_scopes == 0 {
        return Err(anyhow!("Max concurrent scopes must be greater than 0"));
    }

    Ok(())
}
