//! Wire models for the DHIS2 Web API
//!
//! Each paged metadata endpoint wraps its records in an envelope keyed by
//! the entity name, alongside a `pager` object. The [`Page`] trait gives
//! the client one paging loop over all four envelope shapes.

use crate::domain::record::DataValue;
use serde::Deserialize;

/// Paging information returned by metadata endpoints
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pager {
    /// Current page, 1-based
    pub page: usize,

    /// Total number of pages
    pub page_count: usize,
}

/// A paged response envelope
pub trait Page {
    /// Record type carried by the page
    type Record;

    /// Paging information
    fn pager(&self) -> &Pager;

    /// Consumes the page and returns its records
    fn into_records(self) -> Vec<Self::Record>;
}

/// Reference to a parent organisation unit
#[derive(Debug, Clone, Deserialize)]
pub struct ParentRef {
    pub id: String,
}

/// Organisation unit as returned by `/api/organisationUnits`
#[derive(Debug, Clone, Deserialize)]
pub struct ApiOrgUnit {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub parent: Option<ParentRef>,
}

/// Page of organisation units
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrgUnitsPage {
    pub pager: Pager,
    #[serde(default)]
    pub organisation_units: Vec<ApiOrgUnit>,
}

impl Page for OrgUnitsPage {
    type Record = ApiOrgUnit;

    fn pager(&self) -> &Pager {
        &self.pager
    }

    fn into_records(self) -> Vec<ApiOrgUnit> {
        self.organisation_units
    }
}

/// Entity carrying only an id and a display name
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiNamed {
    pub id: String,
    pub display_name: String,
}

/// Page of category option combos
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionCombosPage {
    pub pager: Pager,
    #[serde(default)]
    pub category_option_combos: Vec<ApiNamed>,
}

impl Page for OptionCombosPage {
    type Record = ApiNamed;

    fn pager(&self) -> &Pager {
        &self.pager
    }

    fn into_records(self) -> Vec<ApiNamed> {
        self.category_option_combos
    }
}

/// Page of data elements
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataElementsPage {
    pub pager: Pager,
    #[serde(default)]
    pub data_elements: Vec<ApiNamed>,
}

impl Page for DataElementsPage {
    type Record = ApiNamed;

    fn pager(&self) -> &Pager {
        &self.pager
    }

    fn into_records(self) -> Vec<ApiNamed> {
        self.data_elements
    }
}

/// Reference to a data element by id
#[derive(Debug, Clone, Deserialize)]
pub struct IdRef {
    pub id: String,
}

/// Data element group as returned by `/api/dataElementGroups`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiElementGroup {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub data_elements: Vec<IdRef>,
}

/// Page of data element groups
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementGroupsPage {
    pub pager: Pager,
    #[serde(default)]
    pub data_element_groups: Vec<ApiElementGroup>,
}

impl Page for ElementGroupsPage {
    type Record = ApiElementGroup;

    fn pager(&self) -> &Pager {
        &self.pager
    }

    fn into_records(self) -> Vec<ApiElementGroup> {
        self.data_element_groups
    }
}

/// Response of `/api/dataValueSets`
///
/// The server omits `dataValues` entirely when a unit has no data for the
/// requested periods.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataValueSetResponse {
    #[serde(default)]
    pub data_values: Vec<DataValue>,
}
