// Harvest - DHIS2 Bulk Data-Value Extraction Tool
// Copyright (c) 2026 Harvest Contributors
// Licensed under the MIT License

//! # Harvest - DHIS2 bulk extraction
//!
//! Harvest extracts time-indexed data values and organisational metadata
//! from a DHIS2-compatible health information system, persists them as
//! local artifacts, and consolidates them into one filtered dataset joined
//! against the flattened organisation unit hierarchy.
//!
//! ## Architecture
//!
//! Harvest follows a layered architecture:
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Pipeline stages (metadata, extract, hierarchy, merge)
//! - [`adapters`] - DHIS2 Web API integration
//! - [`domain`] - Core domain types and models
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging and observability
//!
//! ## Pipeline
//!
//! One `extract` run walks the full pipeline:
//!
//! 1. Metadata load-or-fetch: four metadata kinds, cached as JSON
//!    snapshots so repeat runs skip the download.
//! 2. Hierarchy flattening: the parent-linked unit forest becomes
//!    fixed-width ancestor-chain rows.
//! 3. Resume scan: units with an existing output file are skipped.
//! 4. Concurrent extraction: bounded worker fan-out over units, sequential
//!    period windows per unit, one CSV file per unit.
//! 5. Merge: per-unit files are filtered by data element and consolidated.
//! 6. Join: the consolidated dataset gains the hierarchy level columns.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use harvest::adapters::dhis2::Dhis2Client;
//! use harvest::config::load_config;
//! use harvest::core::metadata::{MetadataCache, MetadataStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("harvest.toml")?;
//!     let client = Dhis2Client::new(config.dhis2.clone())?;
//!     let store = MetadataStore::new(&config.extract.metadata_dir);
//!
//!     let metadata = MetadataCache::load_or_fetch(&client, &store).await?;
//!     println!("{} organisation units", metadata.units().len());
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Harvest uses the [`domain::HarvestError`] type for all errors:
//!
//! ```rust,no_run
//! use harvest::domain::HarvestError;
//!
//! fn example() -> Result<(), HarvestError> {
//!     // Errors are automatically converted using the ? operator
//!     let config = harvest::config::load_config("harvest.toml")?;
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
