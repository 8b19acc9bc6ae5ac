//! Measurement record models
//!
//! [`DataValue`] is the wire shape returned by `GET /api/dataValueSets`.
//! [`EnrichedRecord`] is the tabular row written to per-unit output files
//! after id-to-display-name resolution. Records are immutable once
//! produced; enrichment builds a new row rather than mutating the wire
//! value.

use serde::{Deserialize, Serialize};

/// A single data value as returned by the DHIS2 API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataValue {
    /// Data element id
    pub data_element: String,

    /// Period token the value belongs to
    pub period: String,

    /// Organisation unit id
    pub org_unit: String,

    /// Category option combo id
    pub category_option_combo: String,

    /// Attribute option combo id
    pub attribute_option_combo: String,

    /// The recorded value, kept verbatim
    pub value: String,

    /// User who stored the value
    #[serde(default)]
    pub stored_by: Option<String>,

    /// Creation timestamp, passed through as reported by the server
    #[serde(default)]
    pub created: Option<String>,

    /// Last update timestamp
    #[serde(default)]
    pub last_updated: Option<String>,

    /// Free-text comment
    #[serde(default)]
    pub comment: Option<String>,

    /// Follow-up flag
    #[serde(default)]
    pub followup: Option<bool>,
}

/// An enriched, display-name-resolved row of the per-unit output
///
/// Field order defines the CSV column order; the csv writer derives the
/// header row from these field names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedRecord {
    /// Organisation unit id (join key for merge and hierarchy join)
    pub org_unit: String,

    /// Period token
    pub period: String,

    /// Data element id, kept alongside the display name so the merge
    /// filter can match either form
    pub data_element_id: String,

    /// Data element display name
    pub data_element: String,

    /// Data element group name, empty when the element is ungrouped
    pub data_element_group: String,

    /// Category option combo display name (falls back to the raw id)
    pub category_option_combo: String,

    /// Attribute option combo display name (falls back to the raw id)
    pub attribute_option_combo: String,

    /// The recorded value
    pub value: String,

    /// User who stored the value
    pub stored_by: String,

    /// Creation timestamp
    pub created: String,

    /// Last update timestamp
    pub last_updated: String,

    /// Free-text comment
    pub comment: String,

    /// Follow-up flag
    pub follow_up: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_value_deserialize_full() {
        let json = r#"{
            "dataElement": "rmqxJ1TtUEA",
            "period": "2010Q1",
            "orgUnit": "FZN1YXK7fWW",
            "categoryOptionCombo": "HllvX50cXC0",
            "attributeOptionCombo": "HllvX50cXC0",
            "value": "12",
            "storedBy": "admin",
            "created": "2010-04-02T00:00:00.000",
            "lastUpdated": "2010-04-02T00:00:00.000",
            "comment": "verified",
            "followup": false
        }"#;

        let dv: DataValue = serde_json::from_str(json).unwrap();
        assert_eq!(dv.data_element, "rmqxJ1TtUEA");
        assert_eq!(dv.org_unit, "FZN1YXK7fWW");
        assert_eq!(dv.value, "12");
        assert_eq!(dv.followup, Some(false));
    }

    #[test]
    fn test_data_value_deserialize_sparse() {
        // Servers omit optional fields for values never touched by a user
        let json = r#"{
            "dataElement": "rmqxJ1TtUEA",
            "period": "2010Q1",
            "orgUnit": "FZN1YXK7fWW",
            "categoryOptionCombo": "HllvX50cXC0",
            "attributeOptionCombo": "HllvX50cXC0",
            "value": "0"
        }"#;

        let dv: DataValue = serde_json::from_str(json).unwrap();
        assert!(dv.stored_by.is_none());
        assert!(dv.comment.is_none());
        assert!(dv.followup.is_none());
    }

    #[test]
    fn test_enriched_record_csv_header() {
        let mut writer = csv::Writer::from_writer(vec![]);
        writer
            .serialize(EnrichedRecord {
                org_unit: "u1".into(),
                period: "2010Q1".into(),
                data_element_id: "e1".into(),
                data_element: "Malaria PF".into(),
                data_element_group: "Malaria".into(),
                category_option_combo: "default".into(),
                attribute_option_combo: "default".into(),
                value: "3".into(),
                stored_by: "admin".into(),
                created: "".into(),
                last_updated: "".into(),
                comment: "".into(),
                follow_up: false,
            })
            .unwrap();

        let out = String::from_utf8(writer.into_inner().unwrap()).unwrap();
        let mut lines = out.lines();
        assert_eq!(
            lines.next().unwrap(),
            "org_unit,period,data_element_id,data_element,data_element_group,\
             category_option_combo,attribute_option_combo,value,stored_by,\
             created,last_updated,comment,follow_up"
        );
        assert!(lines.next().unwrap().starts_with("u1,2010Q1,e1,Malaria PF"));
    }
}
