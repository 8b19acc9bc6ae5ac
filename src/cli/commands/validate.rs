//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the Harvest configuration file.

use crate::config::load_config;
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        // load_config validates as its last step, so reaching Ok means the
        // configuration is structurally and semantically valid
        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Configuration is invalid");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        println!("✅ Configuration is valid");
        println!();
        println!("Configuration Summary:");
        println!("  Log Level: {}", config.application.log_level);
        println!("  DHIS2 Server: {}", config.dhis2.base_url);
        println!(
            "  Authentication: {}",
            if config.dhis2.username.is_some() {
                "basic"
            } else {
                "none"
            }
        );
        println!("  Page Size: {}", config.dhis2.page_size);
        println!("  Data Set: {}", config.extract.dataset_id);
        println!(
            "  Periods: {} to {} ({:?}, {} per window)",
            config.extract.periods.start,
            config.extract.periods.end,
            config.extract.periods.granularity,
            config.extract.periods.periods_per_window
        );
        println!("  Workers: {}", config.extract.workers);
        println!("  Output Directory: {}", config.extract.output_dir);
        println!("  Metadata Directory: {}", config.extract.metadata_dir);
        println!(
            "  Element Filter: {} element(s)",
            config.merge.include_elements.len()
        );
        println!("  Hierarchy Depth: {}", config.hierarchy.depth);
        println!("  Final Output: {}", config.hierarchy.final_output_path);
        println!();
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_args_creation() {
        let args = ValidateArgs {};
        let _ = format!("{args:?}");
    }
}
