//! Merge and filter
//!
//! Consolidates the per-unit extraction outputs into one dataset, keeping
//! only rows for the configured data elements. The destination is removed
//! at the start of every run and rebuilt from scratch, so a re-run after a
//! partial merge can never leave duplicated rows behind. Inputs are
//! streamed row by row; only one record is in memory at a time.
//!
//! The element filter matches on the element id or its resolved display
//! name, so the include list can be written either way.

use crate::domain::{HarvestError, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Outcome of the merge stage
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeSummary {
    /// Per-unit files scanned
    pub files_scanned: usize,

    /// Rows read across all inputs
    pub rows_read: usize,

    /// Rows that passed the element filter
    pub rows_written: usize,
}

/// Merges per-unit outputs into one filtered dataset
///
/// Input files are visited in sorted name order so the output is
/// deterministic. The first file that contributes a row fixes the header;
/// a later file with a different header is a hard error because silently
/// mixing shapes would corrupt the consolidated dataset.
pub fn merge_filtered(
    output_dir: &Path,
    include_elements: &[String],
    merged_path: &Path,
) -> Result<MergeSummary> {
    let include: HashSet<&str> = include_elements.iter().map(String::as_str).collect();

    // Truncate-then-rebuild: never append to a previous run's output
    if merged_path.exists() {
        std::fs::remove_file(merged_path).map_err(|e| {
            HarvestError::Merge(format!(
                "Failed to remove previous output {}: {e}",
                merged_path.display()
            ))
        })?;
    }

    let mut summary = MergeSummary::default();
    let mut writer: Option<csv::Writer<std::fs::File>> = None;
    let mut established_header: Option<csv::StringRecord> = None;

    for path in unit_files(output_dir)? {
        summary.files_scanned += 1;

        let mut reader = csv::Reader::from_path(&path).map_err(|e| {
            HarvestError::Merge(format!("Failed to open {}: {e}", path.display()))
        })?;
        let headers = reader.headers()?.clone();

        let id_column = headers.iter().position(|h| h == "data_element_id");
        let name_column = headers.iter().position(|h| h == "data_element");
        if id_column.is_none() && name_column.is_none() {
            return Err(HarvestError::Merge(format!(
                "{} has neither a data_element_id nor a data_element column",
                path.display()
            )));
        }

        if let Some(established) = &established_header {
            if *established != headers {
                return Err(HarvestError::Merge(format!(
                    "{} header differs from the established output header",
                    path.display()
                )));
            }
        }

        for record in reader.records() {
            let record = record?;
            summary.rows_read += 1;

            let matches = id_column
                .and_then(|i| record.get(i))
                .is_some_and(|id| include.contains(id))
                || name_column
                    .and_then(|i| record.get(i))
                    .is_some_and(|name| include.contains(name));
            if !matches {
                continue;
            }

            if writer.is_none() {
                if let Some(parent) = merged_path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                let mut w = csv::Writer::from_path(merged_path)?;
                w.write_record(&headers)?;
                established_header = Some(headers.clone());
                writer = Some(w);
            }
            if let Some(w) = writer.as_mut() {
                w.write_record(&record)?;
                summary.rows_written += 1;
            }
        }
    }

    if let Some(mut w) = writer {
        w.flush()?;
    }

    tracing::info!(
        files_scanned = summary.files_scanned,
        rows_read = summary.rows_read,
        rows_written = summary.rows_written,
        path = %merged_path.display(),
        "Merged per-unit outputs"
    );

    Ok(summary)
}

/// Per-unit CSV files in sorted name order
fn unit_files(output_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    if !output_dir.is_dir() {
        return Ok(files);
    }

    for entry in std::fs::read_dir(output_dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some("csv") {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const HEADER: &str = "org_unit,period,data_element_id,data_element,value";

    fn write_unit(dir: &TempDir, name: &str, rows: &[&str]) {
        let mut contents = format!("{HEADER}\n");
        for row in rows {
            contents.push_str(row);
            contents.push('\n');
        }
        std::fs::write(dir.path().join(name), contents).unwrap();
    }

    fn includes(elements: &[&str]) -> Vec<String> {
        elements.iter().map(|e| e.to_string()).collect()
    }

    #[test]
    fn test_filter_keeps_only_included_elements() {
        let dir = TempDir::new().unwrap();
        write_unit(
            &dir,
            "u1.csv",
            &[
                "u1,2010Q1,e1,Malaria PF,5",
                "u1,2010Q1,e2,Measles,9",
                "u1,2010Q2,e1,Malaria PF,7",
            ],
        );
        let merged = dir.path().join("merged.csv");

        let summary = merge_filtered(dir.path(), &includes(&["e1"]), &merged).unwrap();

        assert_eq!(summary.rows_read, 3);
        assert_eq!(summary.rows_written, 2);
        let contents = std::fs::read_to_string(&merged).unwrap();
        assert!(contents.contains("Malaria PF"));
        assert!(!contents.contains("Measles"));
    }

    #[test]
    fn test_filter_matches_display_name_too() {
        let dir = TempDir::new().unwrap();
        write_unit(&dir, "u1.csv", &["u1,2010Q1,e2,Measles,9"]);
        let merged = dir.path().join("merged.csv");

        let summary = merge_filtered(dir.path(), &includes(&["Measles"]), &merged).unwrap();
        assert_eq!(summary.rows_written, 1);
    }

    #[test]
    fn test_header_written_once_across_files() {
        let dir = TempDir::new().unwrap();
        write_unit(&dir, "u1.csv", &["u1,2010Q1,e1,Malaria PF,5"]);
        write_unit(&dir, "u2.csv", &["u2,2010Q1,e1,Malaria PF,3"]);
        let merged = dir.path().join("merged.csv");

        merge_filtered(dir.path(), &includes(&["e1"]), &merged).unwrap();

        let contents = std::fs::read_to_string(&merged).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], HEADER);
        assert_eq!(lines.iter().filter(|l| **l == HEADER).count(), 1);
        // Sorted file order: u1's row precedes u2's
        assert!(lines[1].starts_with("u1,"));
        assert!(lines[2].starts_with("u2,"));
    }

    #[test]
    fn test_previous_output_removed_even_when_nothing_matches() {
        let dir = TempDir::new().unwrap();
        write_unit(&dir, "u1.csv", &["u1,2010Q1,e1,Malaria PF,5"]);
        let merged = dir.path().join("merged.csv");
        std::fs::write(&merged, "stale previous run\n").unwrap();

        let summary = merge_filtered(dir.path(), &includes(&["absent"]), &merged).unwrap();

        assert_eq!(summary.rows_written, 0);
        assert!(!merged.exists());
    }

    #[test]
    fn test_missing_output_dir_yields_empty_summary() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("units");
        let merged = dir.path().join("merged.csv");

        let summary = merge_filtered(&missing, &includes(&["e1"]), &merged).unwrap();
        assert_eq!(summary, MergeSummary::default());
    }

    #[test]
    fn test_file_without_element_columns_rejected() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("u1.csv"), "foo,bar\n1,2\n").unwrap();
        let merged = dir.path().join("merged.csv");

        let err = merge_filtered(dir.path(), &includes(&["e1"]), &merged).unwrap_err();
        assert!(matches!(err, HarvestError::Merge(_)));
    }

    #[test]
    fn test_mismatched_header_rejected() {
        let dir = TempDir::new().unwrap();
        write_unit(&dir, "u1.csv", &["u1,2010Q1,e1,Malaria PF,5"]);
        std::fs::write(
            dir.path().join("u2.csv"),
            "org_unit,data_element_id\nu2,e1\n",
        )
        .unwrap();
        let merged = dir.path().join("merged.csv");

        let err = merge_filtered(dir.path(), &includes(&["e1"]), &merged).unwrap_err();
        assert!(matches!(err, HarvestError::Merge(_)));
    }
}
