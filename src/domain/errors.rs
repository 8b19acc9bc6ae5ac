//! Domain error types
//!
//! This module defines the error hierarchy for Harvest. All errors are
//! domain-specific and don't expose third-party types.
//!
//! The taxonomy separates fatal run-level failures (metadata fetch,
//! malformed hierarchy) from per-unit failures that are collected into the
//! run summary and never abort sibling units.

use crate::domain::ids::UnitId;
use thiserror::Error;

/// Main Harvest error type
///
/// This is the primary error type used throughout the application.
/// It wraps specific error types and provides context for error handling.
#[derive(Debug, Error)]
pub enum HarvestError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// DHIS2 API errors
    #[error("DHIS2 error: {0}")]
    Dhis2(#[from] Dhis2Error),

    /// Metadata is a prerequisite for enrichment; always fatal for the run
    #[error("Metadata error: {0}")]
    Metadata(String),

    /// Hierarchy flattening errors (fatal)
    #[error("Hierarchy error: {0}")]
    Hierarchy(#[from] HierarchyError),

    /// Extraction phase errors
    #[error("Extraction error: {0}")]
    Extract(String),

    /// Merge/join phase errors
    #[error("Merge error: {0}")]
    Merge(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// CSV read/write errors
    #[error("CSV error: {0}")]
    Csv(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

/// DHIS2 API-specific errors
///
/// Errors that occur when talking to a DHIS2 server. These errors don't
/// expose third-party HTTP client types.
#[derive(Debug, Error)]
pub enum Dhis2Error {
    /// Failed to connect to the DHIS2 server
    #[error("Failed to connect to DHIS2 server: {0}")]
    ConnectionFailed(String),

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Response body could not be decoded
    #[error("Invalid response from server: {0}")]
    InvalidResponse(String),

    /// Server error (5xx)
    #[error("Server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    /// Client error (4xx)
    #[error("Client error: {status} - {message}")]
    ClientError { status: u16, message: String },

    /// Request timeout
    #[error("Request timeout: {0}")]
    Timeout(String),
}

/// Hierarchy flattening errors
///
/// Both variants are fatal: a dangling parent reference or an
/// unexpectedly deep chain indicates malformed source metadata, and
/// silently truncating would corrupt the fixed-width hierarchy contract
/// with downstream consumers.
#[derive(Debug, Error)]
pub enum HierarchyError {
    /// A unit references a parent id that is not in the unit set
    #[error("Unit {unit_id} references missing ancestor {parent_id}")]
    MissingAncestor { unit_id: UnitId, parent_id: String },

    /// A parent chain exceeds the configured maximum depth
    #[error("Unit {unit_id} has ancestor chain of depth {depth}, exceeding maximum {max_depth}")]
    TooDeep {
        unit_id: UnitId,
        depth: usize,
        max_depth: usize,
    },
}

// Conversion from std::io::Error
impl From<std::io::Error> for HarvestError {
    fn from(err: std::io::Error) -> Self {
        HarvestError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for HarvestError {
    fn from(err: serde_json::Error) -> Self {
        HarvestError::Serialization(err.to_string())
    }
}

// Conversion from csv::Error
impl From<csv::Error> for HarvestError {
    fn from(err: csv::Error) -> Self {
        HarvestError::Csv(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for HarvestError {
    fn from(err: toml::de::Error) -> Self {
        HarvestError::Configuration(format!("TOML parse error: {err}"))
    }
}
