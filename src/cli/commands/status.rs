//! Status command implementation
//!
//! Shows which metadata snapshots are present and how many units already
//! have an output file. Everything is read from the local filesystem; the
//! DHIS2 server is never contacted.

use crate::config::load_config;
use crate::core::extract::completed_units;
use crate::core::metadata::{snapshot_names, MetadataStore};
use clap::Args;
use std::path::Path;

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {}

impl StatusArgs {
    /// Execute the status command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Checking extraction status");

        println!("📊 Extraction Status");
        println!();

        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        let store = MetadataStore::new(&config.extract.metadata_dir);
        println!("Metadata snapshots ({}):", config.extract.metadata_dir);
        for name in snapshot_names() {
            let marker = if store.exists(name) { "✅" } else { "❌" };
            println!("  {marker} {name}");
        }
        println!();

        let output_dir = Path::new(&config.extract.output_dir);
        match completed_units(output_dir) {
            Ok(completed) => {
                println!("Per-unit outputs ({}):", config.extract.output_dir);
                if completed.is_empty() {
                    println!("  No units extracted yet.");
                    println!("  Run 'harvest extract' to start.");
                } else {
                    println!("  {} units completed", completed.len());
                    println!();
                    println!(
                        "  Note: completion is tracked per unit, not per period window."
                    );
                    println!(
                        "  A unit whose run was cut off mid-extraction still counts as done;"
                    );
                    println!("  delete its file to force re-extraction.");
                }
            }
            Err(e) => {
                println!("❌ Failed to scan output directory");
                println!("   Error: {e}");
                return Ok(5);
            }
        }
        println!();

        let merged = Path::new(&config.merge.output_path);
        let final_output = Path::new(&config.hierarchy.final_output_path);
        println!("Derived datasets:");
        println!(
            "  {} {}",
            if merged.is_file() { "✅" } else { "❌" },
            config.merge.output_path
        );
        println!(
            "  {} {}",
            if final_output.is_file() { "✅" } else { "❌" },
            config.hierarchy.final_output_path
        );
        println!();

        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_args_creation() {
        let args = StatusArgs {};
        let _ = format!("{args:?}");
    }
}
