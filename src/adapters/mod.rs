//! External integrations
//!
//! Adapters wrap remote systems behind narrow interfaces so the core
//! pipeline stays independent of transport details.

pub mod dhis2;
