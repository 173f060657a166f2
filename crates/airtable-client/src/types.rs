use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A raw Airtable row; field names are whatever the base uses
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AirtableRecord {
    pub id: String,
    #[serde(default)]
    pub created_time: Option<String>,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListRecordsResponse {
    #[serde(default)]
    pub(crate) records: Vec<AirtableRecord>,
    pub(crate) offset: Option<String>,
}
