//! Merge command implementation
//!
//! Re-runs the merge/filter and hierarchy join over per-unit outputs from
//! a previous extraction, without touching the DHIS2 server. Useful after
//! changing the element filter.

use crate::cli::commands::extract::run_post_processing;
use crate::config::load_config;
use clap::Args;

/// Arguments for the merge command
#[derive(Args, Debug)]
pub struct MergeArgs {}

impl MergeArgs {
    /// Execute the merge command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Starting merge command");

        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load configuration");
                eprintln!("Failed to load configuration: {e}");
                return Ok(2);
            }
        };

        match run_post_processing(&config) {
            Ok(()) => {
                println!("✅ Merge completed successfully!");
                Ok(0)
            }
            Err(code) => Ok(code),
        }
    }
}
