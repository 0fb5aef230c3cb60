//! Wire types exchanged with the KPI data API.
//!
//! The API is a thin JSON layer over the municipal statistics database; these
//! structs mirror its payloads and tolerate the extra fields it passes through.

use serde::{Deserialize, Deserializer, Serialize};

/// Municipality code as used by both the data API and the boundary dataset.
pub type RegionId = String;

/// Gender code carried by the aggregate (non-stratified) value of a record.
pub const GENDER_TOTAL: &str = "T";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KpiGroup {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KpiSummary {
    pub id: String,
    pub title: String,
    pub group_title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct KpiSearchPage {
    #[serde(default)]
    pub results: Vec<KpiSummary>,
    #[serde(default)]
    pub has_more: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenderValue {
    pub gender: String,
    #[serde(default)]
    pub value: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MunicipalityRecord {
    pub municipality: RegionId,
    #[serde(default, deserialize_with = "deserialize_nullable_values")]
    pub values: Vec<GenderValue>,
}

/// `"values": null` shows up for municipalities without data; treat it like
/// an empty list so the rest of the response still decodes.
fn deserialize_nullable_values<'de, D>(deserializer: D) -> Result<Vec<GenderValue>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<GenderValue>>::deserialize(deserializer)?.unwrap_or_default())
}

impl MunicipalityRecord {
    /// The value tagged with [`GENDER_TOTAL`], if the record carries one.
    ///
    /// Records are stratified by gender; only the aggregate is charted.
    pub fn total_value(&self) -> Option<f64> {
        self.values
            .iter()
            .find(|entry| entry.gender == GENDER_TOTAL)
            .and_then(|entry| entry.value)
            .filter(|value| value.is_finite())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryPoint {
    #[serde(deserialize_with = "deserialize_year")]
    pub year: i32,
    pub value: f64,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum YearRepr {
    Number(i64),
    Text(String),
}

/// Periods arrive as integers from the statistics database but as strings
/// from the year listing, so accept both.
fn deserialize_year<'de, D>(deserializer: D) -> Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    match YearRepr::deserialize(deserializer)? {
        YearRepr::Number(year) => i32::try_from(year).map_err(serde::de::Error::custom),
        YearRepr::Text(text) => text.trim().parse().map_err(serde::de::Error::custom),
    }
}
