//! Extraction scheduler
//!
//! Bounded-concurrency driver for per-unit extraction. Up to `workers`
//! units are in flight at once; within one unit the period windows run
//! strictly in sequence, so each unit's file sees a single writer and the
//! header-then-rows order is preserved no matter how unit completions
//! interleave.
//!
//! Failure isolation: a window fetch error is recorded and the unit moves
//! on to its next window; a sink write error aborts that unit only. Both
//! end up as warnings in the run summary rather than aborting siblings.

use crate::adapters::dhis2::DataValueSource;
use crate::core::extract::resume;
use crate::core::extract::sink::UnitSink;
use crate::core::extract::summary::ExtractSummary;
use crate::core::metadata::MetadataCache;
use crate::domain::ids::{DatasetId, UnitId};
use crate::domain::period::PeriodWindow;
use crate::domain::record::EnrichedRecord;
use crate::domain::Result;
use futures::stream::{self, StreamExt};
use std::path::PathBuf;
use std::time::Instant;
use tokio::sync::watch;

/// How one unit's extraction ended
#[derive(Debug)]
enum UnitStatus {
    /// Output file written with this many records
    Written(usize),
    /// No window returned any record; no file created
    Empty,
    /// Sink write failed; the unit was aborted
    Failed(String),
    /// Shutdown signal observed before this unit started
    Interrupted,
}

/// Outcome of one unit, collected by the driver
#[derive(Debug)]
struct UnitOutcome {
    unit_id: UnitId,
    status: UnitStatus,
    /// Window fetch failures that did not abort the unit
    window_failures: Vec<String>,
}

/// Bounded-concurrency extraction driver
pub struct ExtractionScheduler {
    dataset: DatasetId,
    windows: Vec<PeriodWindow>,
    output_dir: PathBuf,
    workers: usize,
}

impl ExtractionScheduler {
    /// Creates a scheduler over a fixed window partition
    pub fn new(
        dataset: DatasetId,
        windows: Vec<PeriodWindow>,
        output_dir: impl Into<PathBuf>,
        workers: usize,
    ) -> Self {
        Self {
            dataset,
            windows,
            output_dir: output_dir.into(),
            workers: workers.max(1),
        }
    }

    /// Runs extraction over every unit not already completed
    ///
    /// The resume scan decides the pending set; completed units are
    /// skipped wholesale. The shutdown receiver is checked at unit
    /// boundaries only, so an interrupt never leaves a file with
    /// interleaved or torn rows.
    pub async fn run<S: DataValueSource>(
        &self,
        source: &S,
        metadata: &MetadataCache,
        shutdown: watch::Receiver<bool>,
    ) -> Result<ExtractSummary> {
        let start = Instant::now();

        let completed = resume::completed_units(&self.output_dir)?;
        let all_ids = metadata.units().sorted_ids();

        let mut summary = ExtractSummary::new(all_ids.len());
        let pending: Vec<UnitId> = all_ids
            .into_iter()
            .filter(|id| !completed.contains(id))
            .collect();
        summary.skipped_resumed = summary.total_units - pending.len();

        tracing::info!(
            total_units = summary.total_units,
            pending = pending.len(),
            skipped_resumed = summary.skipped_resumed,
            workers = self.workers,
            windows = self.windows.len(),
            "Starting extraction"
        );

        let outcomes: Vec<UnitOutcome> = stream::iter(
            pending
                .into_iter()
                .map(|unit| self.process_unit(source, metadata, unit, shutdown.clone())),
        )
        .buffer_unordered(self.workers)
        .collect()
        .await;

        for outcome in outcomes {
            summary.window_failures += outcome.window_failures.len();
            for failure in outcome.window_failures {
                summary.add_warning(failure);
            }
            match outcome.status {
                UnitStatus::Written(records) => {
                    summary.units_with_data += 1;
                    summary.records_written += records;
                }
                UnitStatus::Empty => summary.units_empty += 1,
                UnitStatus::Failed(reason) => {
                    summary.units_failed += 1;
                    summary.add_warning(format!("unit {}: {}", outcome.unit_id, reason));
                }
                UnitStatus::Interrupted => summary.interrupted = true,
            }
        }

        summary = summary.with_duration(start.elapsed());
        summary.log_summary();
        Ok(summary)
    }

    /// Extracts one unit: sequential windows, lazy header-once sink
    async fn process_unit<S: DataValueSource>(
        &self,
        source: &S,
        metadata: &MetadataCache,
        unit: UnitId,
        shutdown: watch::Receiver<bool>,
    ) -> UnitOutcome {
        if *shutdown.borrow() {
            return UnitOutcome {
                unit_id: unit,
                status: UnitStatus::Interrupted,
                window_failures: Vec::new(),
            };
        }

        tracing::debug!(unit = %unit, "Processing unit");

        let mut sink = UnitSink::new(&self.output_dir, &unit);
        let mut window_failures = Vec::new();
        let mut records_written = 0usize;

        for window in &self.windows {
            let values = match source.data_values(&self.dataset, &unit, window).await {
                Ok(values) => values,
                Err(e) => {
                    tracing::warn!(
                        unit = %unit,
                        window = %window,
                        error = %e,
                        "Window fetch failed, continuing with next window"
                    );
                    window_failures.push(format!("unit {unit} window {window}: {e}"));
                    continue;
                }
            };

            if values.is_empty() {
                continue;
            }

            let rows: Vec<EnrichedRecord> =
                values.into_iter().map(|v| metadata.enrich(v)).collect();

            if let Err(e) = sink.append(&rows) {
                tracing::error!(unit = %unit, error = %e, "Sink write failed, aborting unit");
                return UnitOutcome {
                    unit_id: unit,
                    status: UnitStatus::Failed(e.to_string()),
                    window_failures,
                };
            }
            records_written += rows.len();
        }

        let status = match sink.finish() {
            Ok(true) => UnitStatus::Written(records_written),
            Ok(false) => UnitStatus::Empty,
            Err(e) => UnitStatus::Failed(e.to_string()),
        };

        UnitOutcome {
            unit_id: unit,
            status,
            window_failures,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::extract::sink::unit_path;
    use crate::core::metadata::MetadataCache;
    use crate::domain::record::DataValue;
    use crate::domain::{HarvestError, Dhis2Error, OrgUnit};
    use async_trait::async_trait;
    use std::collections::{HashMap, HashSet};
    use tempfile::TempDir;

    /// Deterministic in-memory source keyed by (unit, window)
    struct FakeSource {
        data: HashMap<(String, String), Vec<DataValue>>,
        failing: HashSet<(String, String)>,
    }

    impl FakeSource {
        fn new() -> Self {
            Self {
                data: HashMap::new(),
                failing: HashSet::new(),
            }
        }

        fn with_values(mut self, unit: &str, window: &str, elements: &[(&str, &str)]) -> Self {
            let values = elements
                .iter()
                .map(|(element, value)| DataValue {
                    data_element: element.to_string(),
                    period: window.split(',').next().unwrap().to_string(),
                    org_unit: unit.to_string(),
                    category_option_combo: "c1".to_string(),
                    attribute_option_combo: "c1".to_string(),
                    value: value.to_string(),
                    stored_by: Some("admin".to_string()),
                    created: Some("2010-04-02".to_string()),
                    last_updated: Some("2010-04-02".to_string()),
                    comment: None,
                    followup: Some(false),
                })
                .collect();
            self.data
                .insert((unit.to_string(), window.to_string()), values);
            self
        }

        fn with_failure(mut self, unit: &str, window: &str) -> Self {
            self.failing
                .insert((unit.to_string(), window.to_string()));
            self
        }
    }

    #[async_trait]
    impl DataValueSource for FakeSource {
        async fn data_values(
            &self,
            _dataset: &DatasetId,
            unit: &UnitId,
            window: &PeriodWindow,
        ) -> crate::domain::Result<Vec<DataValue>> {
            let key = (unit.as_str().to_string(), window.as_str().to_string());
            if self.failing.contains(&key) {
                return Err(HarvestError::Dhis2(Dhis2Error::Timeout(
                    "simulated".to_string(),
                )));
            }
            Ok(self.data.get(&key).cloned().unwrap_or_default())
        }
    }

    fn metadata_with_units(ids: &[&str]) -> MetadataCache {
        let units = ids
            .iter()
            .map(|id| OrgUnit::new(UnitId::new(*id).unwrap(), format!("Unit {id}"), None))
            .collect();
        let elements = HashMap::from([
            ("e1".to_string(), "Element One".to_string()),
            ("e2".to_string(), "Element Two".to_string()),
        ]);
        MetadataCache::from_parts(units, HashMap::new(), elements, vec![])
    }

    fn windows(tokens: &[&str]) -> Vec<PeriodWindow> {
        tokens
            .iter()
            .map(|t| PeriodWindow::new(&[t.to_string()]))
            .collect()
    }

    fn scheduler(dir: &TempDir, workers: usize, window_tokens: &[&str]) -> ExtractionScheduler {
        ExtractionScheduler::new(
            DatasetId::new("ds1").unwrap(),
            windows(window_tokens),
            dir.path(),
            workers,
        )
    }

    fn no_shutdown() -> watch::Receiver<bool> {
        // borrow() keeps returning the last value after the sender drops
        let (_tx, rx) = watch::channel(false);
        rx
    }

    #[tokio::test]
    async fn test_resume_skips_completed_units() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("u1.csv"), "existing\n").unwrap();
        std::fs::write(dir.path().join("u3.csv"), "existing\n").unwrap();

        let source = FakeSource::new()
            .with_values("u1", "2010Q1", &[("e1", "1")])
            .with_values("u2", "2010Q1", &[("e1", "2")])
            .with_values("u3", "2010Q1", &[("e1", "3")]);
        let metadata = metadata_with_units(&["u1", "u2", "u3"]);

        let summary = scheduler(&dir, 4, &["2010Q1"])
            .run(&source, &metadata, no_shutdown())
            .await
            .unwrap();

        assert_eq!(summary.skipped_resumed, 2);
        assert_eq!(summary.units_with_data, 1);
        // Existing outputs are untouched
        assert_eq!(
            std::fs::read_to_string(dir.path().join("u1.csv")).unwrap(),
            "existing\n"
        );
        assert!(dir.path().join("u2.csv").is_file());
    }

    #[tokio::test]
    async fn test_header_once_across_windows() {
        let dir = TempDir::new().unwrap();
        let source = FakeSource::new()
            .with_values("u1", "2010Q1", &[("e1", "1")])
            .with_values("u1", "2010Q2", &[("e2", "2")]);
        let metadata = metadata_with_units(&["u1"]);

        scheduler(&dir, 2, &["2010Q1", "2010Q2"])
            .run(&source, &metadata, no_shutdown())
            .await
            .unwrap();

        let contents =
            std::fs::read_to_string(unit_path(dir.path(), &UnitId::new("u1").unwrap())).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("org_unit,"));
        // Rows follow window order
        assert!(lines[1].contains("2010Q1"));
        assert!(lines[2].contains("2010Q2"));
    }

    #[tokio::test]
    async fn test_window_failure_does_not_abort_unit() {
        let dir = TempDir::new().unwrap();
        let source = FakeSource::new()
            .with_failure("u1", "2010Q1")
            .with_values("u1", "2010Q2", &[("e1", "5")]);
        let metadata = metadata_with_units(&["u1"]);

        let summary = scheduler(&dir, 1, &["2010Q1", "2010Q2"])
            .run(&source, &metadata, no_shutdown())
            .await
            .unwrap();

        assert_eq!(summary.window_failures, 1);
        assert_eq!(summary.units_with_data, 1);
        assert_eq!(summary.units_failed, 0);
        assert!(!summary.is_successful());

        let contents =
            std::fs::read_to_string(unit_path(dir.path(), &UnitId::new("u1").unwrap())).unwrap();
        assert!(contents.contains("2010Q2"));
    }

    #[tokio::test]
    async fn test_empty_unit_leaves_no_file() {
        let dir = TempDir::new().unwrap();
        let source = FakeSource::new();
        let metadata = metadata_with_units(&["u1"]);

        let summary = scheduler(&dir, 1, &["2010Q1"])
            .run(&source, &metadata, no_shutdown())
            .await
            .unwrap();

        assert_eq!(summary.units_empty, 1);
        assert!(!unit_path(dir.path(), &UnitId::new("u1").unwrap()).exists());
    }

    #[tokio::test]
    async fn test_worker_count_does_not_change_output() {
        let source = FakeSource::new()
            .with_values("u1", "2010Q1", &[("e1", "1"), ("e2", "2")])
            .with_values("u1", "2010Q2", &[("e1", "3")])
            .with_values("u2", "2010Q1", &[("e2", "4")])
            .with_values("u3", "2010Q2", &[("e1", "5")]);
        let metadata = metadata_with_units(&["u1", "u2", "u3"]);
        let window_tokens = ["2010Q1", "2010Q2"];

        let dir_serial = TempDir::new().unwrap();
        scheduler(&dir_serial, 1, &window_tokens)
            .run(&source, &metadata, no_shutdown())
            .await
            .unwrap();

        let dir_parallel = TempDir::new().unwrap();
        scheduler(&dir_parallel, 20, &window_tokens)
            .run(&source, &metadata, no_shutdown())
            .await
            .unwrap();

        for unit in ["u1", "u2", "u3"] {
            let unit = UnitId::new(unit).unwrap();
            let serial = std::fs::read(unit_path(dir_serial.path(), &unit)).unwrap();
            let parallel = std::fs::read(unit_path(dir_parallel.path(), &unit)).unwrap();
            assert_eq!(serial, parallel);
        }
    }

    #[tokio::test]
    async fn test_shutdown_skips_remaining_units() {
        let dir = TempDir::new().unwrap();
        let source = FakeSource::new().with_values("u1", "2010Q1", &[("e1", "1")]);
        let metadata = metadata_with_units(&["u1", "u2"]);

        let (tx, rx) = watch::channel(true);
        drop(tx);

        let summary = scheduler(&dir, 1, &["2010Q1"])
            .run(&source, &metadata, rx)
            .await
            .unwrap();

        assert!(summary.interrupted);
        assert_eq!(summary.units_with_data, 0);
        assert!(!unit_path(dir.path(), &UnitId::new("u1").unwrap()).exists());
    }
}
