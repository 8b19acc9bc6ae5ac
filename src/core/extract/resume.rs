//! Resume tracking
//!
//! A unit is considered extracted when its per-unit output file exists;
//! the scan is read-only and the scheduler simply skips the returned ids.
//! Completion is tracked at unit granularity only: a unit whose previous
//! run failed after the header was written still counts as complete. The
//! (unit, window) progress ledger that would close this gap is a known
//! follow-up, surfaced by the status command.

use crate::domain::ids::UnitId;
use crate::domain::Result;
use std::collections::HashSet;
use std::path::Path;

/// Returns the set of unit ids with an existing output resource
///
/// A missing output directory yields an empty set; the first run creates
/// it on demand.
pub fn completed_units(output_dir: &Path) -> Result<HashSet<UnitId>> {
    let mut completed = HashSet::new();

    if !output_dir.is_dir() {
        return Ok(completed);
    }

    for entry in std::fs::read_dir(output_dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("csv") {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            if let Ok(id) = UnitId::new(stem) {
                completed.insert(id);
            }
        }
    }

    Ok(completed)
}
