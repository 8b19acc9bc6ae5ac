//! CLI command implementations
//!
//! This module contains all CLI command implementations.

pub mod extract;
pub mod init;
pub mod merge;
pub mod status;
pub mod validate;
