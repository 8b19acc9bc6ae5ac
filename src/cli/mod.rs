//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for Harvest using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// Harvest - DHIS2 bulk extraction tool
#[derive(Parser, Debug)]
#[command(name = "harvest")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "harvest.toml", env = "HARVEST_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "HARVEST_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Extract data values from DHIS2, then merge and join
    Extract(commands::extract::ExtractArgs),

    /// Re-run the merge and hierarchy join over existing per-unit outputs
    Merge(commands::merge::MergeArgs),

    /// Show metadata snapshot and extraction progress
    Status(commands::status::StatusArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}
