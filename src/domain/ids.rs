//! Domain identifier types with validation
//!
//! This module provides newtype wrappers for DHIS2 identifiers. Each type
//! ensures type safety so a data element id can never be passed where an
//! organisation unit id is expected.
//!
//! DHIS2 UIDs are 11-character alphanumeric strings, but other deployments
//! use different formats, so validation only rejects empty values.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! id_type {
    ($(#[$doc:meta])* $name:ident, $label:expr) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier from a string
            ///
            /// Returns an error if the id is empty or whitespace-only.
            pub fn new(id: impl Into<String>) -> Result<Self, String> {
                let id = id.into();
                if id.trim().is_empty() {
                    return Err(format!("{} cannot be empty", $label));
                }
                Ok(Self(id))
            }

            /// Returns the identifier as a string slice
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consumes self and returns the inner String
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

id_type!(
    /// Organisation unit identifier
    ///
    /// # Examples
    ///
    /// ```
    /// use harvest::domain::ids::UnitId;
    /// use std::str::FromStr;
    ///
    /// let unit_id = UnitId::from_str("FZN1YXK7fWW").unwrap();
    /// assert_eq!(unit_id.as_str(), "FZN1YXK7fWW");
    /// ```
    UnitId,
    "Organisation unit ID"
);

id_type!(
    /// Data element identifier
    ElementId,
    "Data element ID"
);

id_type!(
    /// Category or attribute option combination identifier
    ComboId,
    "Option combo ID"
);

id_type!(
    /// Data set identifier
    DatasetId,
    "Data set ID"
);
