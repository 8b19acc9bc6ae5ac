//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::HarvestConfig;
use crate::config::secret::secret_string;
use crate::domain::errors::HarvestError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into HarvestConfig
/// 4. Applies environment variable overrides (HARVEST_* prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns an error if:
/// - File cannot be read
/// - TOML parsing fails
/// - Environment variable substitution fails
/// - Configuration validation fails
///
/// # Examples
///
/// ```no_run
/// use harvest::config::loader::load_config;
///
/// let config = load_config("harvest.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<HarvestConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(HarvestError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        HarvestError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    let contents = substitute_env_vars(&contents)?;

    let mut config: HarvestConfig = toml::from_str(&contents)
        .map_err(|e| HarvestError::Configuration(format!("Failed to parse TOML: {e}")))?;

    apply_env_overrides(&mut config);

    config.validate().map_err(|e| {
        HarvestError::Configuration(format!("Configuration validation failed: {e}"))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are left untouched so documentation examples in the
/// config file don't require the variables to be set.
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("static regex");
    let mut result = String::new();
    let mut missing_vars = Vec::new();

    for line in input.lines() {
        let trimmed = line.trim_start();

        if trimmed.starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    let placeholder = format!("${{{var_name}}}");
                    processed_line = processed_line.replace(&placeholder, &value);
                }
                Err(_) => {
                    if !missing_vars.contains(&var_name.to_string()) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        result.push_str(&processed_line);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(HarvestError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

/// Applies environment variable overrides using the HARVEST_* prefix
///
/// Environment variables follow the pattern: HARVEST_<SECTION>_<KEY>
/// For example: HARVEST_DHIS2_BASE_URL, HARVEST_EXTRACT_WORKERS
fn apply_env_overrides(config: &mut HarvestConfig) {
    if let Ok(val) = std::env::var("HARVEST_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }

    if let Ok(val) = std::env::var("HARVEST_DHIS2_BASE_URL") {
        config.dhis2.base_url = val;
    }
    if let Ok(val) = std::env::var("HARVEST_DHIS2_USERNAME") {
        config.dhis2.username = Some(val);
    }
    if let Ok(val) = std::env::var("HARVEST_DHIS2_PASSWORD") {
        config.dhis2.password = Some(secret_string(val));
    }
    if let Ok(val) = std::env::var("HARVEST_DHIS2_PAGE_SIZE") {
        if let Ok(size) = val.parse() {
            config.dhis2.page_size = size;
        }
    }

    if let Ok(val) = std::env::var("HARVEST_EXTRACT_DATASET_ID") {
        config.extract.dataset_id = val;
    }
    if let Ok(val) = std::env::var("HARVEST_EXTRACT_OUTPUT_DIR") {
        config.extract.output_dir = val;
    }
    if let Ok(val) = std::env::var("HARVEST_EXTRACT_METADATA_DIR") {
        config.extract.metadata_dir = val;
    }
    if let Ok(val) = std::env::var("HARVEST_EXTRACT_WORKERS") {
        if let Ok(workers) = val.parse() {
            config.extract.workers = workers;
        }
    }

    if let Ok(val) = std::env::var("HARVEST_MERGE_OUTPUT_PATH") {
        config.merge.output_path = val;
    }

    if let Ok(val) = std::env::var("HARVEST_HIERARCHY_DEPTH") {
        if let Ok(depth) = val.parse() {
            config.hierarchy.depth = depth;
        }
    }

    if let Ok(val) = std::env::var("HARVEST_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = val.parse().unwrap_or(false);
    }
    if let Ok(val) = std::env::var("HARVEST_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }
}
