//! Configuration management for `snowcast`
//!
//! Handles loading configuration from files, environment variables,
//! and provides validation for all configuration settings.

use crate::SnowcastError;
use crate::http::{ExpiryRule, ExpiryRules, Matcher, UrlModifier, UrlModifiers};
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnowcastConfig {
    /// HTTP client and retry configuration
    #[serde(default)]
    pub http: HttpConfig,
    /// Response store configuration
    #[serde(default)]
    pub cache: CacheConfig,
    /// Forecast source configuration
    #[serde(default)]
    pub forecast: ForecastConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP client settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// User-Agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u32,
    /// Retries after the first attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay_min")]
    pub retry_delay_min_seconds: u32,
    #[serde(default = "default_retry_delay_max")]
    pub retry_delay_max_seconds: u32,
    /// Upstream admission quota, 0 disables the limiter
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,
    /// Concurrent resort builds
    #[serde(default = "default_workers")]
    pub workers: u32,
}

/// Response store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Whether responses are persisted at all
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,
    /// Store directory location
    #[serde(default = "default_cache_location")]
    pub location: String,
    /// Expiry rules in priority order
    #[serde(default = "default_cache_rules")]
    pub rules: Vec<ExpiryRuleConfig>,
    /// URL modifiers in registration order
    #[serde(default)]
    pub mirrors: Vec<MirrorConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpiryRuleConfig {
    /// Substring, or regular expression when `regex` is set
    pub matcher: String,
    pub ttl_minutes: u32,
    #[serde(default)]
    pub regex: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirrorConfig {
    /// Regular expression matched against the request URL
    pub matcher: String,
    pub replacement: String,
}

/// Forecast source settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastConfig {
    /// Maximum age of an NWS document before it is rejected
    #[serde(default = "default_max_age_hours")]
    pub max_age_hours: u32,
    /// Sent as `Feature-Flags` on NWS forecast requests
    #[serde(default = "default_nws_feature_flags")]
    pub nws_feature_flags: String,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty or json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_user_agent() -> String {
    format!("snowcast/{}", crate::VERSION)
}

fn default_timeout() -> u32 {
    10
}

fn default_max_retries() -> u32 {
    2
}

fn default_retry_delay_min() -> u32 {
    5
}

fn default_retry_delay_max() -> u32 {
    15
}

fn default_requests_per_minute() -> u32 {
    300
}

fn default_workers() -> u32 {
    5
}

fn default_cache_enabled() -> bool {
    true
}

fn default_cache_location() -> String {
    "~/.cache/snowcast".to_string()
}

fn default_cache_rules() -> Vec<ExpiryRuleConfig> {
    vec![
        ExpiryRuleConfig {
            matcher: "api.weather.gov/points".to_string(),
            ttl_minutes: 7 * 24 * 60,
            regex: false,
        },
        ExpiryRuleConfig {
            matcher: "api.weather.gov/gridpoints".to_string(),
            ttl_minutes: 60,
            regex: false,
        },
        ExpiryRuleConfig {
            matcher: "api.open-meteo.com".to_string(),
            ttl_minutes: 60,
            regex: false,
        },
    ]
}

fn default_max_age_hours() -> u32 {
    24
}

fn default_nws_feature_flags() -> String {
    "forecast_temperature_qv, forecast_wind_speed_qv".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout_seconds: default_timeout(),
            max_retries: default_max_retries(),
            retry_delay_min_seconds: default_retry_delay_min(),
            retry_delay_max_seconds: default_retry_delay_max(),
            requests_per_minute: default_requests_per_minute(),
            workers: default_workers(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            location: default_cache_location(),
            rules: default_cache_rules(),
            mirrors: Vec::new(),
        }
    }
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            max_age_hours: default_max_age_hours(),
            nws_feature_flags: default_nws_feature_flags(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for SnowcastConfig {
    fn default() -> Self {
        Self {
            http: HttpConfig::default(),
            cache: CacheConfig::default(),
            forecast: ForecastConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl SnowcastConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path(None)
    }

    /// Load configuration from specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        // Load from file if path is provided or use default location
        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path().unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // SNOWCAST_HTTP__MAX_RETRIES=4 overrides http.max_retries
        builder = builder.add_source(
            Environment::with_prefix("SNOWCAST")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: SnowcastConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        // Apply defaults for missing values
        config.apply_defaults();

        // Validate configuration
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("snowcast").join("config.toml"))
    }

    /// Apply default values to missing configuration fields
    pub fn apply_defaults(&mut self) {
        if self.http.user_agent.is_empty() {
            self.http.user_agent = default_user_agent();
        }
        if self.http.timeout_seconds == 0 {
            self.http.timeout_seconds = default_timeout();
        }
        if self.http.workers == 0 {
            self.http.workers = default_workers();
        }
        if self.cache.location.is_empty() {
            self.cache.location = default_cache_location();
        }
        if self.forecast.max_age_hours == 0 {
            self.forecast.max_age_hours = default_max_age_hours();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        self.expiry_rules()?;
        self.url_modifiers()?;
        Ok(())
    }

    /// Validate numeric configuration ranges
    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.http.timeout_seconds > 300 {
            return Err(SnowcastError::config("HTTP timeout cannot exceed 300 seconds").into());
        }

        if self.http.max_retries > 10 {
            return Err(SnowcastError::config("HTTP max retries cannot exceed 10").into());
        }

        if self.http.retry_delay_min_seconds > self.http.retry_delay_max_seconds {
            return Err(SnowcastError::config(
                "Minimum retry delay cannot exceed the maximum retry delay",
            )
            .into());
        }

        if self.http.workers > 64 {
            return Err(SnowcastError::config("Worker count cannot exceed 64").into());
        }

        if self.cache.rules.iter().any(|rule| rule.ttl_minutes == 0) {
            return Err(SnowcastError::config("Cache rule TTL must be at least one minute").into());
        }

        Ok(())
    }

    /// Validate string configuration values
    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(SnowcastError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(SnowcastError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        if self.http.user_agent.trim().is_empty() {
            return Err(SnowcastError::config("HTTP user agent cannot be empty").into());
        }

        Ok(())
    }

    /// Expiry rules in configured order
    pub fn expiry_rules(&self) -> Result<ExpiryRules> {
        let rules = self
            .cache
            .rules
            .iter()
            .map(|rule| -> Result<ExpiryRule> {
                let matcher = if rule.regex {
                    Matcher::pattern(&rule.matcher).map_err(|e| {
                        SnowcastError::config(format!(
                            "Invalid cache rule pattern '{}': {e}",
                            rule.matcher
                        ))
                    })?
                } else {
                    Matcher::substring(rule.matcher.clone())
                };
                Ok(ExpiryRule::new(matcher, i64::from(rule.ttl_minutes)))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(ExpiryRules::new(rules))
    }

    /// URL modifiers in configured order
    pub fn url_modifiers(&self) -> Result<UrlModifiers> {
        let modifiers = self
            .cache
            .mirrors
            .iter()
            .map(|mirror| -> Result<UrlModifier> {
                UrlModifier::mirror(&mirror.matcher, &mirror.replacement).map_err(|e| {
                    SnowcastError::config(format!(
                        "Invalid mirror pattern '{}': {e}",
                        mirror.matcher
                    ))
                    .into()
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(UrlModifiers::new(modifiers))
    }

    /// Store directory with a leading `~` expanded
    #[must_use]
    pub fn cache_path(&self) -> PathBuf {
        match self.cache.location.strip_prefix("~/") {
            Some(rest) => dirs::home_dir()
                .map(|home| home.join(rest))
                .unwrap_or_else(|| PathBuf::from(&self.cache.location)),
            None => PathBuf::from(&self.cache.location),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = SnowcastConfig::default();
        assert_eq!(config.http.timeout_seconds, 10);
        assert_eq!(config.http.max_retries, 2);
        assert_eq!(config.http.retry_delay_min_seconds, 5);
        assert_eq!(config.http.retry_delay_max_seconds, 15);
        assert_eq!(config.forecast.max_age_hours, 24);
        assert_eq!(config.logging.level, "info");
        assert!(config.http.user_agent.starts_with("snowcast/"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_invalid_log_level() {
        let mut config = SnowcastConfig::default();
        config.logging.level = "invalid".to_string();
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Invalid log level"));
    }

    #[test]
    fn test_config_validation_numeric_ranges() {
        let mut config = SnowcastConfig::default();
        config.http.timeout_seconds = 500;
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("timeout cannot exceed"));
    }

    #[test]
    fn test_config_validation_retry_delays() {
        let mut config = SnowcastConfig::default();
        config.http.retry_delay_min_seconds = 20;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_rule_pattern_is_rejected() {
        let mut config = SnowcastConfig::default();
        config.cache.rules.push(ExpiryRuleConfig {
            matcher: "(".to_string(),
            ttl_minutes: 5,
            regex: true,
        });
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Invalid cache rule pattern"));
    }

    #[test]
    fn test_default_rules_cover_forecast_hosts() {
        let rules = SnowcastConfig::default().expiry_rules().unwrap();
        assert!(rules
            .ttl_for("https://api.weather.gov/gridpoints/BOU/1,2/forecast")
            .is_some());
        assert!(rules.ttl_for("https://example.com").is_none());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[http]
max_retries = 4

[[cache.rules]]
matcher = "example.com"
ttl_minutes = 15

[[cache.mirrors]]
matcher = "^https://api\\.weather\\.gov"
replacement = "https://mirror.example.com"
"#
        )
        .unwrap();

        let config = SnowcastConfig::load_from_path(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(config.http.max_retries, 4);
        assert_eq!(config.http.timeout_seconds, 10);
        assert_eq!(config.cache.rules.len(), 1);
        assert_eq!(
            config.url_modifiers().unwrap().apply("https://api.weather.gov/points/1,2"),
            "https://mirror.example.com/points/1,2"
        );
    }

    #[test]
    fn test_cache_path_expands_home() {
        let config = SnowcastConfig::default();
        let path = config.cache_path();
        assert!(!path.to_string_lossy().starts_with('~'));
        assert!(path.to_string_lossy().ends_with(".cache/snowcast"));
    }

    #[test]
    fn test_config_path_generation() {
        let path = SnowcastConfig::get_config_path();
        assert!(path.is_some());
        let path = path.unwrap();
        assert!(path.to_string_lossy().contains("snowcast"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }
}
