//! Configuration schema types
//!
//! This module defines the configuration structure for Harvest. Every
//! section carries its own `validate()` so configuration failures are
//! reported before any network or filesystem work starts.

use crate::config::SecretString;
use crate::domain::period::PeriodGranularity;
use serde::{Deserialize, Serialize};

/// Main Harvest configuration
///
/// This is the root configuration structure that maps to the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarvestConfig {
    /// Application-level settings
    #[serde(default)]
    pub application: ApplicationConfig,

    /// DHIS2 server configuration
    pub dhis2: Dhis2Config,

    /// Extraction settings
    pub extract: ExtractConfig,

    /// Merge/filter settings
    pub merge: MergeConfig,

    /// Hierarchy flattening and join settings
    pub hierarchy: HierarchyConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl HarvestConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid
    pub fn validate(&self) -> Result<(), String> {
        self.application.validate()?;
        self.dhis2.validate()?;
        self.extract.validate()?;
        self.merge.validate()?;
        self.hierarchy.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl ApplicationConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            ));
        }
        Ok(())
    }
}

/// Retry configuration for the DHIS2 client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    /// Initial delay in milliseconds
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Maximum delay in milliseconds
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Backoff multiplier
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

/// DHIS2 server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dhis2Config {
    /// Base URL of the DHIS2 server, without the /api suffix
    pub base_url: String,

    /// Username for basic authentication
    #[serde(default)]
    pub username: Option<String>,

    /// Password for basic authentication
    /// Stored securely in memory and automatically zeroized on drop
    #[serde(default)]
    pub password: Option<SecretString>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Page size for paged metadata endpoints
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Field selection for the organisationUnits endpoint
    #[serde(default = "default_org_unit_fields")]
    pub org_unit_fields: String,

    /// Retry configuration
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Dhis2Config {
    fn validate(&self) -> Result<(), String> {
        if self.base_url.is_empty() {
            return Err("dhis2.base_url cannot be empty".to_string());
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(format!(
                "dhis2.base_url must start with http:// or https://, got '{}'",
                self.base_url
            ));
        }
        if self.page_size == 0 {
            return Err("dhis2.page_size must be greater than 0".to_string());
        }
        if self.timeout_seconds == 0 {
            return Err("dhis2.timeout_seconds must be greater than 0".to_string());
        }
        if self.username.is_some() != self.password.is_some() {
            return Err(
                "dhis2.username and dhis2.password must be provided together".to_string(),
            );
        }
        Ok(())
    }
}

/// Period range configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeriodConfig {
    /// Inclusive start month, YYYY-MM
    pub start: String,

    /// Inclusive end month, YYYY-MM
    pub end: String,

    /// Period granularity (monthly, quarterly, yearly)
    #[serde(default)]
    pub granularity: PeriodGranularity,

    /// Number of period tokens batched into one data request
    #[serde(default = "default_periods_per_window")]
    pub periods_per_window: usize,
}

/// Extraction settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractConfig {
    /// Data set to extract values for
    pub dataset_id: String,

    /// Directory holding one CSV file per organisation unit
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Directory holding metadata snapshot files
    #[serde(default = "default_metadata_dir")]
    pub metadata_dir: String,

    /// Maximum number of units extracted concurrently
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Period range partitioning
    pub periods: PeriodConfig,
}

impl ExtractConfig {
    fn validate(&self) -> Result<(), String> {
        if self.dataset_id.trim().is_empty() {
            return Err("extract.dataset_id cannot be empty".to_string());
        }
        if self.workers == 0 {
            return Err("extract.workers must be greater than 0".to_string());
        }
        if self.periods.periods_per_window == 0 {
            return Err("extract.periods.periods_per_window must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// Merge/filter settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeConfig {
    /// Data elements (ids or display names) to keep in the merged dataset
    pub include_elements: Vec<String>,

    /// Path of the consolidated CSV, recreated on every merge run
    #[serde(default = "default_merged_path")]
    pub output_path: String,
}

impl MergeConfig {
    fn validate(&self) -> Result<(), String> {
        if self.include_elements.is_empty() {
            return Err("merge.include_elements cannot be empty".to_string());
        }
        Ok(())
    }
}

/// Hierarchy flattening and join settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HierarchyConfig {
    /// Total column count of a flattened row: depth - 1 ancestor-name
    /// levels plus the unit id
    #[serde(default = "default_hierarchy_depth")]
    pub depth: usize,

    /// Path of the flattened hierarchy CSV
    #[serde(default = "default_hierarchy_path")]
    pub output_path: String,

    /// Path of the final joined dataset
    #[serde(default = "default_final_path")]
    pub final_output_path: String,
}

impl HierarchyConfig {
    fn validate(&self) -> Result<(), String> {
        if self.depth < 2 {
            return Err("hierarchy.depth must be at least 2".to_string());
        }
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Enable local file logging
    #[serde(default)]
    pub local_enabled: bool,

    /// Directory for local log files
    #[serde(default = "default_log_path")]
    pub local_path: String,

    /// Rotation policy (daily, hourly)
    #[serde(default = "default_log_rotation")]
    pub local_rotation: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            local_enabled: false,
            local_path: default_log_path(),
            local_rotation: default_log_rotation(),
        }
    }
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), String> {
        if self.local_enabled && self.local_path.is_empty() {
            return Err("logging.local_path cannot be empty when file logging is enabled".into());
        }
        match self.local_rotation.as_str() {
            "daily" | "hourly" => Ok(()),
            other => Err(format!(
                "Invalid logging.local_rotation '{other}'. Must be 'daily' or 'hourly'"
            )),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_retries() -> usize {
    3
}

fn default_initial_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    10_000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_timeout_seconds() -> u64 {
    60
}

fn default_page_size() -> usize {
    50
}

fn default_org_unit_fields() -> String {
    "id,name,parent".to_string()
}

fn default_periods_per_window() -> usize {
    4
}

fn default_output_dir() -> String {
    "data/units".to_string()
}

fn default_metadata_dir() -> String {
    "metadata".to_string()
}

fn default_workers() -> usize {
    8
}

fn default_merged_path() -> String {
    "data/merged.csv".to_string()
}

fn default_hierarchy_depth() -> usize {
    5
}

fn default_hierarchy_path() -> String {
    "data/hierarchy.csv".to_string()
}

fn default_final_path() -> String {
    "data/final.csv".to_string()
}

fn default_log_path() -> String {
    "logs".to_string()
}

fn default_log_rotation() -> String {
    "daily".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_toml() -> &'static str {
        r#"
[dhis2]
base_url = "https://dhis2.example.org"
username = "admin"
password = "district"

[extract]
dataset_id = "LNLZYbrGEh6"

[extract.periods]
start = "2010-01"
end = "2013-09"

[merge]
include_elements = ["rmqxJ1TtUEA"]

[hierarchy]
depth = 5
"#
    }

    #[test]
    fn test_minimal_config_parses_and_validates() {
        let config: HarvestConfig = toml::from_str(minimal_toml()).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.extract.workers, 8);
        assert_eq!(config.dhis2.page_size, 50);
        assert_eq!(config.extract.periods.granularity, PeriodGranularity::Quarterly);
        assert_eq!(config.merge.output_path, "data/merged.csv");
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let mut config: HarvestConfig = toml::from_str(minimal_toml()).unwrap();
        config.dhis2.base_url = "ftp://example.org".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_workers_rejected() {
        let mut config: HarvestConfig = toml::from_str(minimal_toml()).unwrap();
        config.extract.workers = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_username_without_password_rejected() {
        let mut config: HarvestConfig = toml::from_str(minimal_toml()).unwrap();
        config.dhis2.password = None;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_filter_rejected() {
        let mut config: HarvestConfig = toml::from_str(minimal_toml()).unwrap();
        config.merge.include_elements.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_depth_lower_bound() {
        let mut config: HarvestConfig = toml::from_str(minimal_toml()).unwrap();
        config.hierarchy.depth = 1;
        assert!(config.validate().is_err());
        config.hierarchy.depth = 2;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_rotation_rejected() {
        let mut config: HarvestConfig = toml::from_str(minimal_toml()).unwrap();
        config.logging.local_rotation = "weekly".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_log_level_rejected() {
        let mut config: HarvestConfig = toml::from_str(minimal_toml()).unwrap();
        config.application.log_level = "verbose".to_string();
        assert!(config.validate().is_err());
    }
}
