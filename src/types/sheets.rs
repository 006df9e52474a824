use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Field mask for `spreadsheets.get`.
pub const METADATA_FIELDS: &str = "spreadsheetId,properties.title,sheets(properties.title,properties.sheetId)";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpreadsheetRange {
    pub spreadsheet_id: String,
    pub range: String,
    pub values: Vec<Vec<Value>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpreadsheetMetadata {
    pub spreadsheet_id: String,
    pub title: Option<String>,
    pub sheets: Vec<SheetInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetInfo {
    pub sheet_id: i64,
    pub title: String,
}

/// Update descriptor returned by an append.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppendUpdates {
    #[serde(default)]
    pub spreadsheet_id: String,
    #[serde(default)]
    pub updated_range: String,
    #[serde(default)]
    pub updated_rows: u64,
    #[serde(default)]
    pub updated_columns: u64,
    #[serde(default)]
    pub updated_cells: u64,
}

// Wire shapes of the Sheets v4 responses.

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SpreadsheetResponse {
    pub spreadsheet_id: String,
    #[serde(default)]
    pub properties: Option<TitleProperties>,
    #[serde(default)]
    pub sheets: Vec<SheetResponse>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TitleProperties {
    pub title: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SheetResponse {
    pub properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SheetProperties {
    #[serde(default)]
    pub sheet_id: i64,
    #[serde(default)]
    pub title: String,
}

impl From<SpreadsheetResponse> for SpreadsheetMetadata {
    fn from(resp: SpreadsheetResponse) -> Self {
        Self {
            spreadsheet_id: resp.spreadsheet_id,
            title: resp.properties.and_then(|p| p.title),
            sheets: resp
                .sheets
                .into_iter()
                .map(|s| SheetInfo {
                    sheet_id: s.properties.sheet_id,
                    title: s.properties.title,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ValueRangeResponse {
    #[serde(default)]
    pub range: Option<String>,
    #[serde(default)]
    pub values: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AppendResponse {
    #[serde(default)]
    pub updates: AppendUpdates,
}
