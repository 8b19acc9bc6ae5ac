//! Configuration management
//!
//! TOML-based configuration with `${VAR}` environment substitution,
//! `HARVEST_*` overrides, and per-section validation.

pub mod loader;
pub mod schema;
pub mod secret;

pub use loader::load_config;
pub use schema::{
    ApplicationConfig, Dhis2Config, ExtractConfig, HarvestConfig, HierarchyConfig, LoggingConfig,
    MergeConfig, PeriodConfig, RetryConfig,
};
pub use secret::{secret_string, SecretString, SecretValue};
