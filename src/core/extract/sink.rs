//! Per-unit record sink
//!
//! Append-only CSV persistence for one unit's enriched records. The file
//! is created lazily on the first non-empty batch: any stale partial file
//! from a previous failed run is removed, the header is written exactly
//! once, and subsequent batches append rows only. Units that never yield
//! a record leave no file behind, which keeps the resume scan honest.

use crate::domain::record::EnrichedRecord;
use crate::domain::ids::UnitId;
use crate::domain::{HarvestError, Result};
use std::fs::File;
use std::path::{Path, PathBuf};

/// CSV sink for a single unit's output resource
pub struct UnitSink {
    path: PathBuf,
    writer: Option<csv::Writer<File>>,
}

impl UnitSink {
    /// Creates a sink for `unit_id`; no file is touched until the first
    /// append
    pub fn new(output_dir: &Path, unit_id: &UnitId) -> Self {
        Self {
            path: unit_path(output_dir, unit_id),
            writer: None,
        }
    }

    /// Appends a batch of records, creating the file and writing the
    /// header on the first call
    pub fn append(&mut self, records: &[EnrichedRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        if self.writer.is_none() {
            if let Some(parent) = self.path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| sink_error(&self.path, "create output directory", e))?;
            }
            // A leftover file here is a partial output from a run that
            // died before this unit completed; rebuild from scratch
            if self.path.exists() {
                tracing::warn!(path = %self.path.display(), "Removing stale partial output");
                std::fs::remove_file(&self.path)
                    .map_err(|e| sink_error(&self.path, "remove stale output", e))?;
            }
            let file = File::create(&self.path)
                .map_err(|e| sink_error(&self.path, "create output", e))?;
            self.writer = Some(csv::Writer::from_writer(file));
        }

        if let Some(writer) = self.writer.as_mut() {
            for record in records {
                writer
                    .serialize(record)
                    .map_err(|e| HarvestError::Csv(format!("{}: {e}", self.path.display())))?;
            }
        }
        Ok(())
    }

    /// Flushes the sink; returns true if a file was created
    pub fn finish(mut self) -> Result<bool> {
        match self.writer.take() {
            Some(mut writer) => {
                writer
                    .flush()
                    .map_err(|e| sink_error(&self.path, "flush output", e))?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Deterministic output path for a unit
pub fn unit_path(output_dir: &Path, unit_id: &UnitId) -> PathBuf {
    output_dir.join(format!("{}.csv", unit_id.as_str()))
}

fn sink_error(path: &Path, action: &str, e: std::io::Error) -> HarvestError {
    HarvestError::Io(format!("Failed to {action} {}: {e}", path.display()))
}
