//! Core pipeline stages

pub mod extract;
pub mod hierarchy;
pub mod merge;
pub mod metadata;
