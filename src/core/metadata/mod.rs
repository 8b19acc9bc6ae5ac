//! Metadata cache
//!
//! Four independent mappings loaded once per run and read-only
//! thereafter: organisation units, category option combos, data elements,
//! and data element groups. Each mapping is backed by a JSON snapshot in
//! the [`MetadataStore`]; a snapshot on disk short-circuits the download.

pub mod store;

pub use store::MetadataStore;

use crate::adapters::dhis2::Dhis2Client;
use crate::domain::ids::{ComboId, ElementId, UnitId};
use crate::domain::record::{DataValue, EnrichedRecord};
use crate::domain::{OrgUnit, Result, UnitIndex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const ORG_UNITS: &str = "org_units";
const OPTION_COMBOS: &str = "category_option_combos";
const DATA_ELEMENTS: &str = "data_elements";
const ELEMENT_GROUPS: &str = "data_element_groups";

/// Display name and group of a data element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementInfo {
    pub display_name: String,
    /// Empty when the element belongs to no group
    pub group_name: String,
}

/// Snapshot shape of a data element group
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupSnapshot {
    pub id: String,
    pub name: String,
    pub element_ids: Vec<String>,
}

/// Read-only metadata for one run
///
/// Owned by the run, shared immutably with the extraction workers. No
/// locking is needed because nothing writes after construction.
#[derive(Debug, Clone)]
pub struct MetadataCache {
    units: UnitIndex,
    combo_names: HashMap<ComboId, String>,
    elements: HashMap<ElementId, ElementInfo>,
    groups: HashMap<String, GroupSnapshot>,
}

impl MetadataCache {
    /// Loads every metadata kind from the store, downloading and
    /// snapshotting whatever is missing
    pub async fn load_or_fetch(client: &Dhis2Client, store: &MetadataStore) -> Result<Self> {
        let units: Vec<OrgUnit> = if store.exists(ORG_UNITS) {
            tracing::info!("Loading organisation units from snapshot");
            store.load(ORG_UNITS)?
        } else {
            tracing::info!("Downloading organisation units");
            let units = client.fetch_org_units().await?;
            store.save(ORG_UNITS, &units)?;
            units
        };

        let combo_names: HashMap<String, String> = if store.exists(OPTION_COMBOS) {
            tracing::info!("Loading category option combos from snapshot");
            store.load(OPTION_COMBOS)?
        } else {
            tracing::info!("Downloading category option combos");
            let combos = client.fetch_option_combos().await?;
            let map: HashMap<String, String> = combos
                .into_iter()
                .map(|c| (c.id, c.display_name))
                .collect();
            store.save(OPTION_COMBOS, &map)?;
            map
        };

        let element_names: HashMap<String, String> = if store.exists(DATA_ELEMENTS) {
            tracing::info!("Loading data elements from snapshot");
            store.load(DATA_ELEMENTS)?
        } else {
            tracing::info!("Downloading data elements");
            let elements = client.fetch_data_elements().await?;
            let map: HashMap<String, String> = elements
                .into_iter()
                .map(|e| (e.id, e.display_name))
                .collect();
            store.save(DATA_ELEMENTS, &map)?;
            map
        };

        let groups: Vec<GroupSnapshot> = if store.exists(ELEMENT_GROUPS) {
            tracing::info!("Loading data element groups from snapshot");
            store.load(ELEMENT_GROUPS)?
        } else {
            tracing::info!("Downloading data element groups");
            let groups: Vec<GroupSnapshot> = client
                .fetch_element_groups()
                .await?
                .into_iter()
                .map(|g| GroupSnapshot {
                    id: g.id,
                    name: g.name,
                    element_ids: g.data_elements.into_iter().map(|e| e.id).collect(),
                })
                .collect();
            store.save(ELEMENT_GROUPS, &groups)?;
            groups
        };

        Ok(Self::from_parts(units, combo_names, element_names, groups))
    }

    /// Builds the cache from already-decoded mappings
    pub fn from_parts(
        units: Vec<OrgUnit>,
        combo_names: HashMap<String, String>,
        element_names: HashMap<String, String>,
        groups: Vec<GroupSnapshot>,
    ) -> Self {
        // Derive element id -> group name once; the per-record path is a
        // plain map lookup
        let mut group_of_element: HashMap<&str, &str> = HashMap::new();
        for group in &groups {
            for element_id in &group.element_ids {
                group_of_element.insert(element_id, &group.name);
            }
        }

        let elements = element_names
            .iter()
            .filter_map(|(id, display_name)| {
                let info = ElementInfo {
                    display_name: display_name.clone(),
                    group_name: group_of_element
                        .get(id.as_str())
                        .map(|g| g.to_string())
                        .unwrap_or_default(),
                };
                ElementId::new(id.clone()).ok().map(|id| (id, info))
            })
            .collect();

        let combo_names = combo_names
            .into_iter()
            .filter_map(|(id, name)| ComboId::new(id).ok().map(|id| (id, name)))
            .collect();

        let groups = groups.into_iter().map(|g| (g.id.clone(), g)).collect();

        Self {
            units: UnitIndex::from_units(units),
            combo_names,
            elements,
            groups,
        }
    }

    /// The organisation unit index
    pub fn units(&self) -> &UnitIndex {
        &self.units
    }

    /// Number of known data element groups
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Resolves a combo id to its display name, falling back to the id
    pub fn combo_name<'a>(&'a self, id: &'a str) -> &'a str {
        ComboId::new(id)
            .ok()
            .and_then(|id| self.combo_names.get(&id))
            .map(String::as_str)
            .unwrap_or(id)
    }

    /// Resolves an element id to display and group names
    pub fn element_info(&self, id: &str) -> Option<&ElementInfo> {
        ElementId::new(id).ok().and_then(|id| self.elements.get(&id))
    }

    /// Enriches one wire record into its output row
    ///
    /// Unknown ids fall back to the raw id (element/combo) or an empty
    /// group name; enrichment never fails.
    pub fn enrich(&self, value: DataValue) -> EnrichedRecord {
        let (data_element, data_element_group) = match self.element_info(&value.data_element) {
            Some(info) => (info.display_name.clone(), info.group_name.clone()),
            None => (value.data_element.clone(), String::new()),
        };

        EnrichedRecord {
            org_unit: value.org_unit,
            period: value.period,
            data_element_id: value.data_element,
            data_element,
            data_element_group,
            category_option_combo: self.combo_name(&value.category_option_combo).to_string(),
            attribute_option_combo: self.combo_name(&value.attribute_option_combo).to_string(),
            value: value.value,
            stored_by: value.stored_by.unwrap_or_default(),
            created: value.created.unwrap_or_default(),
            last_updated: value.last_updated.unwrap_or_default(),
            comment: value.comment.unwrap_or_default(),
            follow_up: value.followup.unwrap_or(false),
        }
    }

    /// Checks the parent-reference invariant over the full unit set
    ///
    /// Every non-root's parent must exist in the unit set. A violation is
    /// a fatal metadata error for the run, never a per-unit failure.
    pub fn validate_units(&self) -> Result<()> {
        for unit in self.units.iter() {
            if let Some(parent) = &unit.parent {
                if !self.units.contains(parent) {
                    return Err(crate::domain::HarvestError::Metadata(format!(
                        "Organisation unit {} references unknown parent {}",
                        unit.id, parent
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Convenience lookup used by tests and the status command
pub fn snapshot_names() -> [&'static str; 4] {
    [ORG_UNITS, OPTION_COMBOS, DATA_ELEMENTS, ELEMENT_GROUPS]
}
