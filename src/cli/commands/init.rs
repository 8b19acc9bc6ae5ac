//! Init command implementation
//!
//! This module implements the `init` command for generating a sample
//! configuration file.

use clap::Args;
use std::fs;
use std::path::Path;

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path where to create the configuration file
    #[arg(short, long, default_value = "harvest.toml")]
    pub output: String,

    /// Overwrite existing file
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    /// Execute the init command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(output = %self.output, "Initializing configuration file");

        println!("📝 Initializing Harvest configuration");
        println!();

        if Path::new(&self.output).exists() && !self.force {
            println!("❌ Configuration file already exists: {}", self.output);
            println!("   Use --force to overwrite");
            return Ok(2);
        }

        match fs::write(&self.output, Self::sample_config()) {
            Ok(_) => {
                println!("✅ Configuration file created: {}", self.output);
                println!();
                println!("Next steps:");
                println!("  1. Edit {} with your server and data set", self.output);
                println!("  2. Set HARVEST_DHIS2_USERNAME and HARVEST_DHIS2_PASSWORD");
                println!("     in the environment or a .env file");
                println!("  3. Validate configuration: harvest validate-config");
                println!("  4. Run extraction: harvest extract");
                println!();
                Ok(0)
            }
            Err(e) => {
                println!("❌ Failed to write configuration file");
                println!("   Error: {e}");
                Ok(5)
            }
        }
    }

    /// Sample configuration written by `harvest init`
    fn sample_config() -> &'static str {
        r#"# Harvest Configuration File
# DHIS2 bulk data-value extraction tool

[application]
log_level = "info"

[dhis2]
base_url = "https://play.dhis2.org/demo"
username = "${HARVEST_DHIS2_USERNAME}"
password = "${HARVEST_DHIS2_PASSWORD}"
timeout_seconds = 60
page_size = 50
# Fields requested for organisation units
org_unit_fields = "id,name,parent"

[dhis2.retry]
max_retries = 3
initial_delay_ms = 500
max_delay_ms = 10000
backoff_multiplier = 2.0

[extract]
dataset_id = "LNLZYbrGEh6"
output_dir = "data/units"
metadata_dir = "metadata"
workers = 8

[extract.periods]
start = "2010-01"
end = "2013-09"
# monthly | quarterly | yearly
granularity = "quarterly"
periods_per_window = 4

[merge]
# Data element ids or display names to keep in the merged dataset
include_elements = ["rmqxJ1TtUEA"]
output_path = "data/merged.csv"

[hierarchy]
# Total columns per flattened row: depth - 1 ancestor levels + unit id
depth = 5
output_path = "data/hierarchy.csv"
final_output_path = "data/final.csv"

[logging]
local_enabled = false
local_path = "logs"
# daily | hourly
local_rotation = "daily"
"#
    }
}
