//! Hierarchy join
//!
//! Inner join of the consolidated dataset with the flattened hierarchy on
//! unit id. Consolidated rows whose unit has no hierarchy entry are
//! dropped; a true root legitimately has no flattened row. The merged
//! input is streamed row by row, only the hierarchy table is held in
//! memory.

use crate::domain::{HarvestError, Result};
use std::collections::HashMap;
use std::path::Path;

/// Outcome of the join stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinSummary {
    /// Rows written to the final dataset
    pub rows_written: usize,

    /// Consolidated rows dropped for lack of a hierarchy entry
    pub rows_dropped: usize,
}

/// Joins the consolidated dataset with the flattened hierarchy
///
/// The final dataset's header is the consolidated header followed by the
/// hierarchy level columns. The output file is recreated on every run.
pub fn join_with_hierarchy(
    merged_path: &Path,
    hierarchy_path: &Path,
    final_path: &Path,
) -> Result<JoinSummary> {
    let (level_columns, hierarchy) = load_hierarchy(hierarchy_path)?;

    let mut reader = csv::Reader::from_path(merged_path).map_err(|e| {
        HarvestError::Merge(format!(
            "Failed to open consolidated dataset {}: {e}",
            merged_path.display()
        ))
    })?;

    let headers = reader.headers()?.clone();
    let unit_column = headers
        .iter()
        .position(|h| h == "org_unit")
        .ok_or_else(|| {
            HarvestError::Merge(format!(
                "Consolidated dataset {} has no org_unit column",
                merged_path.display()
            ))
        })?;

    if let Some(parent) = final_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(final_path)?;

    let mut header: Vec<&str> = headers.iter().collect();
    header.extend(level_columns.iter().map(String::as_str));
    writer.write_record(&header)?;

    let mut summary = JoinSummary {
        rows_written: 0,
        rows_dropped: 0,
    };

    for record in reader.records() {
        let record = record?;
        let unit_id = record.get(unit_column).unwrap_or_default();

        match hierarchy.get(unit_id) {
            Some(levels) => {
                let mut row: Vec<&str> = record.iter().collect();
                row.extend(levels.iter().map(String::as_str));
                writer.write_record(&row)?;
                summary.rows_written += 1;
            }
            None => {
                summary.rows_dropped += 1;
            }
        }
    }

    writer.flush()?;
    tracing::info!(
        rows_written = summary.rows_written,
        rows_dropped = summary.rows_dropped,
        path = %final_path.display(),
        "Joined dataset with hierarchy"
    );

    Ok(summary)
}

/// Loads the flattened hierarchy into a unit-id lookup
///
/// Returns the level column names and the unit id -> level values map.
/// The unit id is expected in the last column, matching the flattener's
/// output shape.
fn load_hierarchy(path: &Path) -> Result<(Vec<String>, HashMap<String, Vec<String>>)> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| {
        HarvestError::Merge(format!(
            "Failed to open flattened hierarchy {}: {e}",
            path.display()
        ))
    })?;

    let headers = reader.headers()?.clone();
    if headers.len() < 2 {
        return Err(HarvestError::Merge(format!(
            "Flattened hierarchy {} has fewer than two columns",
            path.display()
        )));
    }
    let level_columns: Vec<String> = headers
        .iter()
        .take(headers.len() - 1)
        .map(String::from)
        .collect();

    let mut map = HashMap::new();
    for record in reader.records() {
        let record = record?;
        let unit_id = record
            .get(record.len() - 1)
            .unwrap_or_default()
            .to_string();
        let levels: Vec<String> = record.iter().take(record.len() - 1).map(String::from).collect();
        map.insert(unit_id, levels);
    }

    Ok((level_columns, map))
}
