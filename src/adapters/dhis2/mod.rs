//! DHIS2 Web API adapter

pub mod client;
pub mod models;

pub use client::{DataValueSource, Dhis2Client};
