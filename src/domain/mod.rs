//! Domain models and types for Harvest.
//!
//! This module contains the core domain models, types, and business rules
//! for Harvest.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Strongly-typed identifiers** ([`UnitId`], [`ElementId`], [`ComboId`], [`DatasetId`])
//! - **Domain models** ([`OrgUnit`], [`DataValue`], [`EnrichedRecord`])
//! - **Error types** ([`HarvestError`], [`Dhis2Error`], [`HierarchyError`])
//! - **Result type alias** ([`Result`])
//!
//! # Type Safety
//!
//! Harvest uses the newtype pattern for identifiers to prevent mixing
//! different ID types:
//!
//! ```rust
//! use harvest::domain::{UnitId, ElementId};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let unit_id = UnitId::new("FZN1YXK7fWW")?;
//! let element_id = ElementId::new("rmqxJ1TtUEA")?;
//!
//! // This won't compile - type safety prevents mixing IDs
//! // let wrong: UnitId = element_id;  // Compile error!
//! # Ok(())
//! # }
//! ```

pub mod errors;
pub mod ids;
pub mod org_unit;
pub mod period;
pub mod record;
pub mod result;

// Re-export commonly used types for convenience
pub use errors::{Dhis2Error, HarvestError, HierarchyError};
pub use ids::{ComboId, DatasetId, ElementId, UnitId};
pub use org_unit::{OrgUnit, UnitIndex};
pub use period::{PeriodGranularity, PeriodPlan, PeriodWindow};
pub use record::{DataValue, EnrichedRecord};
pub use result::Result;
