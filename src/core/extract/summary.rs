//! Extraction summary and reporting
//!
//! Per-phase counts for the run report: how many units were skipped by
//! the resume scan, produced data, produced nothing, or failed, plus
//! per-window warnings that never aborted the run.

use std::time::Duration;

/// Summary of one extraction run
#[derive(Debug, Clone, Default)]
pub struct ExtractSummary {
    /// Units in the metadata set
    pub total_units: usize,

    /// Units skipped because their output already existed
    pub skipped_resumed: usize,

    /// Units that produced at least one record
    pub units_with_data: usize,

    /// Units processed without any record for any window
    pub units_empty: usize,

    /// Units aborted by a sink write failure
    pub units_failed: usize,

    /// Individual (unit, window) fetch failures; the affected units kept
    /// going with their remaining windows
    pub window_failures: usize,

    /// Total enriched records written
    pub records_written: usize,

    /// Wall-clock duration of the extraction phase
    pub duration: Duration,

    /// Human-readable warnings collected along the way
    pub warnings: Vec<String>,

    /// True when a shutdown signal cut the unit list short
    pub interrupted: bool,
}

impl ExtractSummary {
    /// Create a new empty summary
    pub fn new(total_units: usize) -> Self {
        Self {
            total_units,
            ..Default::default()
        }
    }

    /// Set the duration
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Record a warning
    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    /// True when no unit failed and no window was skipped
    pub fn is_successful(&self) -> bool {
        self.units_failed == 0 && self.window_failures == 0
    }

    /// Units actually processed this run
    pub fn processed(&self) -> usize {
        self.units_with_data + self.units_empty + self.units_failed
    }

    /// Log the summary
    pub fn log_summary(&self) {
        tracing::info!(
            total_units = self.total_units,
            skipped_resumed = self.skipped_resumed,
            units_with_data = self.units_with_data,
            units_empty = self.units_empty,
            units_failed = self.units_failed,
            window_failures = self.window_failures,
            records_written = self.records_written,
            duration_secs = self.duration.as_secs(),
            interrupted = self.interrupted,
            "Extraction completed"
        );

        for warning in &self.warnings {
            tracing::warn!(warning = %warning, "Extraction warning");
        }
    }
}
