//! Hierarchy flattening and joining

pub mod flatten;
pub mod join;

pub use flatten::{flatten_hierarchy, write_hierarchy_csv, FlattenedRow};
pub use join::{join_with_hierarchy, JoinSummary};
