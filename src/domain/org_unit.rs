//! Organisation unit domain model
//!
//! Organisation units form a forest: every unit has a unique id and an
//! optional parent reference. The [`UnitIndex`] is the pre-built id lookup
//! used by the hierarchy flattener so ancestor walks cost O(depth) per
//! unit instead of rescanning the unit list.

use crate::domain::ids::UnitId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single organisation unit node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgUnit {
    /// Unique unit identifier
    pub id: UnitId,

    /// Display name of the unit
    pub name: String,

    /// Parent unit id; `None` for root units
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<UnitId>,
}

impl OrgUnit {
    /// Creates a new organisation unit
    pub fn new(id: UnitId, name: impl Into<String>, parent: Option<UnitId>) -> Self {
        Self {
            id,
            name: name.into(),
            parent,
        }
    }

    /// Returns true if this unit has no parent
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// Read-only index of organisation units keyed by id
///
/// Built once per run from the downloaded unit set and shared by the
/// flattener and the scheduler. Never mutated after construction.
#[derive(Debug, Clone, Default)]
pub struct UnitIndex {
    units: HashMap<UnitId, OrgUnit>,
}

impl UnitIndex {
    /// Builds an index from a list of units
    pub fn from_units(units: Vec<OrgUnit>) -> Self {
        let units = units.into_iter().map(|u| (u.id.clone(), u)).collect();
        Self { units }
    }

    /// Looks up a unit by id
    pub fn get(&self, id: &UnitId) -> Option<&OrgUnit> {
        self.units.get(id)
    }

    /// Returns true if the index contains the given id
    pub fn contains(&self, id: &UnitId) -> bool {
        self.units.contains_key(id)
    }

    /// Number of indexed units
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Returns true if the index is empty
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Iterates over all units in unspecified order
    pub fn iter(&self) -> impl Iterator<Item = &OrgUnit> {
        self.units.values()
    }

    /// Returns all unit ids, sorted for deterministic scheduling order
    pub fn sorted_ids(&self) -> Vec<UnitId> {
        let mut ids: Vec<UnitId> = self.units.keys().cloned().collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(id: &str, name: &str, parent: Option<&str>) -> OrgUnit {
        OrgUnit::new(
            UnitId::new(id).unwrap(),
            name,
            parent.map(|p| UnitId::new(p).unwrap()),
        )
    }

    #[test]
    fn test_is_root() {
        assert!(unit("r", "Root", None).is_root());
        assert!(!unit("c", "Child", Some("r")).is_root());
    }

    #[test]
    fn test_index_lookup() {
        let index = UnitIndex::from_units(vec![
            unit("r", "Root", None),
            unit("c", "Child", Some("r")),
        ]);

        assert_eq!(index.len(), 2);
        assert!(index.contains(&UnitId::new("r").unwrap()));
        assert_eq!(
            index.get(&UnitId::new("c").unwrap()).unwrap().name,
            "Child"
        );
        assert!(index.get(&UnitId::new("missing").unwrap()).is_none());
    }

    #[test]
    fn test_sorted_ids_deterministic() {
        let index = UnitIndex::from_units(vec![
            unit("b", "B", None),
            unit("a", "A", None),
            unit("c", "C", None),
        ]);

        let ids: Vec<String> = index
            .sorted_ids()
            .into_iter()
            .map(|id| id.into_inner())
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_org_unit_deserialize_without_parent() {
        let json = r#"{"id": "r", "name": "Root"}"#;
        let u: OrgUnit = serde_json::from_str(json).unwrap();
        assert!(u.is_root());
    }
}
