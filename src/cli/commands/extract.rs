//! Extract command implementation
//!
//! This module implements the `extract` command: the full pipeline from
//! metadata download through per-unit extraction to the merged and joined
//! final dataset.

use crate::adapters::dhis2::Dhis2Client;
use crate::config::load_config;
use crate::core::extract::ExtractionScheduler;
use crate::core::hierarchy::{flatten_hierarchy, join_with_hierarchy, write_hierarchy_csv};
use crate::core::merge::merge_filtered;
use crate::core::metadata::{MetadataCache, MetadataStore};
use crate::domain::ids::DatasetId;
use crate::domain::period::PeriodPlan;
use clap::Args;
use std::path::Path;
use tokio::sync::watch;

/// Arguments for the extract command
#[derive(Args, Debug)]
pub struct ExtractArgs {
    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Override the number of concurrent unit extractions
    #[arg(long)]
    pub workers: Option<usize>,

    /// Override the data set to extract
    #[arg(long)]
    pub dataset_id: Option<String>,

    /// Stop after extraction, skipping the merge and join stages
    #[arg(long)]
    pub skip_merge: bool,
}

impl ExtractArgs {
    /// Execute the extract command
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        tracing::info!("Starting extract command");

        let mut config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load configuration");
                eprintln!("Failed to load configuration: {e}");
                return Ok(2);
            }
        };

        if let Some(workers) = self.workers {
            tracing::info!(workers, "Overriding worker count from CLI");
            config.extract.workers = workers;
        }
        if let Some(dataset_id) = &self.dataset_id {
            tracing::info!(dataset_id = %dataset_id, "Overriding data set from CLI");
            config.extract.dataset_id = dataset_id.clone();
        }
        if let Err(e) = config.validate() {
            tracing::error!(error = %e, "Configuration validation failed");
            eprintln!("Configuration validation failed: {e}");
            return Ok(2);
        }

        let dataset = match DatasetId::new(config.extract.dataset_id.clone()) {
            Ok(d) => d,
            Err(e) => {
                eprintln!("Invalid data set id: {e}");
                return Ok(2);
            }
        };

        let plan = match PeriodPlan::new(
            &config.extract.periods.start,
            &config.extract.periods.end,
            config.extract.periods.granularity,
        ) {
            Ok(p) => p,
            Err(e) => {
                tracing::error!(error = %e, "Invalid period range");
                eprintln!("Invalid period range: {e}");
                return Ok(2);
            }
        };
        let windows = plan.windows(config.extract.periods.periods_per_window);

        if !self.yes {
            println!("Extraction Configuration:");
            println!("  Server: {}", config.dhis2.base_url);
            println!("  Data set: {}", config.extract.dataset_id);
            println!(
                "  Periods: {} to {} ({} windows)",
                config.extract.periods.start,
                config.extract.periods.end,
                windows.len()
            );
            println!("  Workers: {}", config.extract.workers);
            println!("  Output: {}", config.extract.output_dir);
            println!();
            print!("Proceed with extraction? [y/N]: ");
            use std::io::{self, Write};
            io::stdout().flush()?;

            let mut input = String::new();
            io::stdin().read_line(&mut input)?;

            if !input.trim().eq_ignore_ascii_case("y") {
                println!("Extraction cancelled.");
                return Ok(0);
            }
        }

        let client = match Dhis2Client::new(config.dhis2.clone()) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "Failed to create DHIS2 client");
                eprintln!("Failed to initialize DHIS2 client: {e}");
                return Ok(4);
            }
        };

        println!("📥 Loading metadata...");
        let store = MetadataStore::new(&config.extract.metadata_dir);
        let metadata = match MetadataCache::load_or_fetch(&client, &store).await {
            Ok(m) => m,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load metadata");
                eprintln!("Failed to load metadata: {e}");
                return Ok(4);
            }
        };
        if let Err(e) = metadata.validate_units() {
            tracing::error!(error = %e, "Organisation unit set is inconsistent");
            eprintln!("Organisation unit set is inconsistent: {e}");
            return Ok(5);
        }
        println!(
            "   {} organisation units, {} element groups",
            metadata.units().len(),
            metadata.group_count()
        );

        println!("🌳 Flattening hierarchy...");
        let hierarchy_path = Path::new(&config.hierarchy.output_path);
        let rows = match flatten_hierarchy(metadata.units(), config.hierarchy.depth) {
            Ok(r) => r,
            Err(e) => {
                tracing::error!(error = %e, "Hierarchy flattening failed");
                eprintln!("Hierarchy flattening failed: {e}");
                return Ok(5);
            }
        };
        if let Err(e) = write_hierarchy_csv(&rows, config.hierarchy.depth, hierarchy_path) {
            tracing::error!(error = %e, "Failed to write flattened hierarchy");
            eprintln!("Failed to write flattened hierarchy: {e}");
            return Ok(5);
        }

        println!("🚀 Extracting data values...");
        let scheduler = ExtractionScheduler::new(
            dataset,
            windows,
            &config.extract.output_dir,
            config.extract.workers,
        );
        let summary = match scheduler
            .run(&client, &metadata, shutdown_signal)
            .await
        {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, "Extraction failed");
                eprintln!("Extraction failed: {e}");
                return Ok(5);
            }
        };

        println!();
        println!("📊 Extraction Summary:");
        println!("  Total units: {}", summary.total_units);
        println!("  Resumed (skipped): {}", summary.skipped_resumed);
        println!("  Units with data: {}", summary.units_with_data);
        println!("  Units without data: {}", summary.units_empty);
        println!("  Units failed: {}", summary.units_failed);
        println!("  Window failures: {}", summary.window_failures);
        println!("  Records written: {}", summary.records_written);
        println!("  Duration: {:.2}s", summary.duration.as_secs_f64());
        println!();

        if !summary.warnings.is_empty() {
            println!("⚠️  Warnings:");
            for warning in summary.warnings.iter().take(10) {
                println!("  - {warning}");
            }
            if summary.warnings.len() > 10 {
                println!("  ... and {} more", summary.warnings.len() - 10);
            }
            println!();
        }

        if summary.interrupted {
            println!("⚠️  Extraction interrupted gracefully. Progress saved.");
            println!("   Run the same command to resume.");
            tracing::info!("Extraction interrupted by user signal");
            return Ok(130);
        }

        if !self.skip_merge {
            if let Err(code) = run_post_processing(&config) {
                return Ok(code);
            }
        }

        let exit_code = if summary.is_successful() {
            println!("✅ Extraction completed successfully!");
            0
        } else {
            println!("⚠️  Extraction completed with failures");
            1
        };

        Ok(exit_code)
    }
}

/// Merge and join stages shared with the merge command
pub(crate) fn run_post_processing(config: &crate::config::HarvestConfig) -> Result<(), i32> {
    println!("🔗 Merging per-unit outputs...");
    let merged_path = Path::new(&config.merge.output_path);
    let merge_summary = match merge_filtered(
        Path::new(&config.extract.output_dir),
        &config.merge.include_elements,
        merged_path,
    ) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Merge failed");
            eprintln!("Merge failed: {e}");
            return Err(5);
        }
    };
    println!(
        "   {} files scanned, {} of {} rows kept",
        merge_summary.files_scanned, merge_summary.rows_written, merge_summary.rows_read
    );

    if merge_summary.rows_written == 0 {
        println!("   No rows matched the element filter; skipping join");
        return Ok(());
    }

    println!("🧩 Joining with hierarchy...");
    let join_summary = match join_with_hierarchy(
        merged_path,
        Path::new(&config.hierarchy.output_path),
        Path::new(&config.hierarchy.final_output_path),
    ) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Join failed");
            eprintln!("Join failed: {e}");
            return Err(5);
        }
    };
    println!(
        "   {} rows written, {} dropped without hierarchy entry",
        join_summary.rows_written, join_summary.rows_dropped
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_extract_args_defaults() {
        let args = ExtractArgs {
            yes: false,
            workers: None,
            dataset_id: None,
            skip_merge: false,
        };

        assert!(!args.yes);
        assert!(args.workers.is_none());
        assert!(args.dataset_id.is_none());
        assert!(!args.skip_merge);
    }

    fn config_rooted_at(dir: &TempDir) -> crate::config::HarvestConfig {
        let root = dir.path().display();
        let toml = format!(
            r#"
[dhis2]
base_url = "https://dhis2.example.org"

[extract]
dataset_id = "ds1"
output_dir = "{root}/units"

[extract.periods]
start = "2010-01"
end = "2010-12"

[merge]
include_elements = ["e1"]
output_path = "{root}/merged.csv"

[hierarchy]
depth = 3
output_path = "{root}/hierarchy.csv"
final_output_path = "{root}/final.csv"
"#
        );
        toml::from_str(&toml).unwrap()
    }

    #[test]
    fn test_post_processing_merge_then_join() {
        // Two units with data; only u1 appears in the hierarchy, and only
        // element e1 passes the filter, so the final dataset has exactly
        // one data row
        let dir = TempDir::new().unwrap();
        let config = config_rooted_at(&dir);

        let units = dir.path().join("units");
        std::fs::create_dir_all(&units).unwrap();
        let header = "org_unit,period,data_element_id,data_element,value";
        std::fs::write(
            units.join("u1.csv"),
            format!("{header}\nu1,2010Q1,e1,Malaria PF,5\n"),
        )
        .unwrap();
        std::fs::write(
            units.join("u2.csv"),
            format!("{header}\nu2,2010Q1,e1,Malaria PF,9\nu2,2010Q1,e2,Measles,3\n"),
        )
        .unwrap();
        std::fs::write(
            dir.path().join("hierarchy.csv"),
            "level_1,level_2,org_unit\nNational,District A,u1\n",
        )
        .unwrap();

        run_post_processing(&config).unwrap();

        // The merged dataset keeps e1 rows from both units
        let merged = std::fs::read_to_string(dir.path().join("merged.csv")).unwrap();
        assert_eq!(merged.lines().count(), 3);
        assert!(!merged.contains("Measles"));

        // The join drops u2 for lack of a hierarchy entry
        let final_contents = std::fs::read_to_string(dir.path().join("final.csv")).unwrap();
        let lines: Vec<&str> = final_contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].starts_with("u1,"));
        assert!(lines[1].ends_with("National,District A"));
        assert!(!final_contents.contains("u2"));
    }

    #[test]
    fn test_post_processing_skips_join_when_nothing_matches() {
        let dir = TempDir::new().unwrap();
        let mut config = config_rooted_at(&dir);
        config.merge.include_elements = vec!["absent".to_string()];

        let units = dir.path().join("units");
        std::fs::create_dir_all(&units).unwrap();
        std::fs::write(
            units.join("u1.csv"),
            "org_unit,period,data_element_id,data_element,value\nu1,2010Q1,e1,Malaria PF,5\n",
        )
        .unwrap();

        run_post_processing(&config).unwrap();

        assert!(!dir.path().join("merged.csv").exists());
        assert!(!dir.path().join("final.csv").exists());
    }
}
