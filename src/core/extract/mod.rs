//! Data value extraction

pub mod resume;
pub mod scheduler;
pub mod sink;
pub mod summary;

pub use resume::completed_units;
pub use scheduler::ExtractionScheduler;
pub use sink::{unit_path, UnitSink};
pub use summary::ExtractSummary;
