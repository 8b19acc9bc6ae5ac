//! Hierarchy flattening
//!
//! Turns the parent-linked organisation unit forest into fixed-width
//! ancestor-chain rows: `depth - 1` blank-padded ancestor name columns
//! followed by the unit id. The width is a hard contract with downstream
//! consumers, so an over-deep chain or a dangling parent reference fails
//! the run instead of being truncated.

use crate::domain::ids::UnitId;
use crate::domain::{HarvestError, HierarchyError, Result, UnitIndex};
use std::path::Path;

/// One flattened ancestor-chain row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlattenedRow {
    /// Ancestor names, root first, left-padded with empty strings to
    /// `depth - 1` entries
    pub levels: Vec<String>,

    /// The unit the chain belongs to
    pub unit_id: UnitId,
}

/// Flattens every unit that declares a parent
///
/// Root units produce no row; their count is logged so the omission is
/// visible. Row order follows the index's sorted id order so output is
/// reproducible.
///
/// # Errors
///
/// - [`HarvestError::Configuration`] when `depth` is below 2
/// - [`HierarchyError::MissingAncestor`] when a parent id is absent from
///   the unit set
/// - [`HierarchyError::TooDeep`] when a chain exceeds `depth - 1` ancestors
pub fn flatten_hierarchy(units: &UnitIndex, depth: usize) -> Result<Vec<FlattenedRow>> {
    // A row is depth - 1 ancestor columns plus the unit id, so anything
    // below 2 has no room for even a single ancestor
    if depth < 2 {
        return Err(HarvestError::Configuration(format!(
            "Hierarchy depth must be at least 2, got {depth}"
        )));
    }

    let mut rows = Vec::new();
    let mut roots_skipped = 0usize;

    for id in units.sorted_ids() {
        let Some(unit) = units.get(&id) else {
            continue;
        };
        if unit.parent.is_none() {
            roots_skipped += 1;
            continue;
        }

        let mut ancestors = Vec::new();
        let mut cursor = unit;
        while let Some(parent_id) = &cursor.parent {
            let parent = units.get(parent_id).ok_or_else(|| {
                HierarchyError::MissingAncestor {
                    unit_id: unit.id.clone(),
                    parent_id: parent_id.as_str().to_string(),
                }
            })?;
            ancestors.push(parent.name.clone());

            // A chain longer than the unit count means the parent links
            // form a cycle
            if ancestors.len() > units.len() {
                return Err(HarvestError::Metadata(format!(
                    "Cycle detected in organisation unit hierarchy involving {}",
                    unit.id
                )));
            }
            cursor = parent;
        }

        if ancestors.len() > depth - 1 {
            return Err(HierarchyError::TooDeep {
                unit_id: unit.id.clone(),
                depth: ancestors.len(),
                max_depth: depth - 1,
            }
            .into());
        }

        // Collected child -> root; rows are root -> leaf
        ancestors.reverse();
        let mut levels = vec![String::new(); depth - 1 - ancestors.len()];
        levels.extend(ancestors);

        rows.push(FlattenedRow {
            levels,
            unit_id: unit.id.clone(),
        });
    }

    tracing::debug!(
        rows = rows.len(),
        roots_skipped,
        "Flattened organisation unit hierarchy"
    );

    Ok(rows)
}

/// Writes the flattened hierarchy as CSV
///
/// Columns: `level_1..level_{depth-1}`, then `org_unit`. The file is
/// recreated on every run.
pub fn write_hierarchy_csv(rows: &[FlattenedRow], depth: usize, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(path)?;

    let mut header: Vec<String> = (1..depth).map(|i| format!("level_{i}")).collect();
    header.push("org_unit".to_string());
    writer.write_record(&header)?;

    for row in rows {
        let mut record = row.levels.clone();
        record.push(row.unit_id.as_str().to_string());
        writer.write_record(&record)?;
    }

    writer.flush()?;
    tracing::info!(rows = rows.len(), path = %path.display(), "Wrote flattened hierarchy");
    Ok(())
}
