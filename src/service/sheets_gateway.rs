use serde_json::Value;
use tracing::info;

use crate::api::SheetsApi;
use crate::error::{FolioError, ValidationError, require_non_empty};
use crate::google_oauth::credentials::AuthContext;
use crate::types::{AppendUpdates, SpreadsheetMetadata, SpreadsheetRange};

/// Validated spreadsheet operations. Every check runs before any network call.
#[derive(Clone)]
pub struct SheetsGateway {
    api: SheetsApi,
}

impl SheetsGateway {
    pub fn new(api: SheetsApi) -> Self {
        Self { api }
    }

    pub async fn get_metadata(
        &self,
        auth: &AuthContext,
        spreadsheet_id: &str,
    ) -> Result<SpreadsheetMetadata, FolioError> {
        let id = require_non_empty("spreadsheet_id", spreadsheet_id)?;
        Ok(self.api.get_metadata(auth, id).await?)
    }

    pub async fn read_range(
        &self,
        auth: &AuthContext,
        spreadsheet_id: &str,
        range: &str,
    ) -> Result<SpreadsheetRange, FolioError> {
        let id = require_non_empty("spreadsheet_id", spreadsheet_id)?;
        let range = require_non_empty("range", range)?;
        let (echoed, values) = self.api.read_values(auth, id, range).await?;
        Ok(SpreadsheetRange {
            spreadsheet_id: id.to_string(),
            range: echoed.unwrap_or_else(|| range.to_string()),
            values,
        })
    }

    /// Append rows below the table found in `range`. Not idempotent.
    pub async fn append_rows(
        &self,
        auth: &AuthContext,
        spreadsheet_id: &str,
        range: &str,
        rows: &[Vec<Value>],
    ) -> Result<AppendUpdates, FolioError> {
        let id = require_non_empty("spreadsheet_id", spreadsheet_id)?;
        let range = require_non_empty("range", range)?;
        validate_rows(rows)?;
        let updates = self.api.append_values(auth, id, range, rows).await?;
        info!(
            spreadsheet_id = id,
            updated_range = %updates.updated_range,
            rows = updates.updated_rows,
            "rows appended"
        );
        Ok(updates)
    }
}

/// Rows must be non-empty and every cell a scalar (string, number, bool or null).
pub fn validate_rows(rows: &[Vec<Value>]) -> Result<(), ValidationError> {
    if rows.is_empty() {
        return Err(ValidationError::new("values", "must contain at least one row"));
    }
    for (r, row) in rows.iter().enumerate() {
        if let Some(c) = row
            .iter()
            .position(|cell| matches!(cell, Value::Array(_) | Value::Object(_)))
        {
            return Err(ValidationError::new(
                "values",
                format!("cell [{r}][{c}] must be a scalar"),
            ));
        }
    }
    Ok(())
}

/// Parse a JSON payload shaped as an array of arrays into rows.
pub fn parse_rows(payload: &Value) -> Result<Vec<Vec<Value>>, ValidationError> {
    let Value::Array(rows) = payload else {
        return Err(ValidationError::new("values", "must be an array of rows"));
    };
    let rows = rows
        .iter()
        .enumerate()
        .map(|(r, row)| match row {
            Value::Array(cells) => Ok(cells.clone()),
            _ => Err(ValidationError::new(
                "values",
                format!("row {r} must be an array of cells"),
            )),
        })
        .collect::<Result<Vec<_>, _>>()?;
    validate_rows(&rows)?;
    Ok(rows)
}
