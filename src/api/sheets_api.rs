use serde::Deserialize;
use serde_json::{Value, json};
use url::Url;

use super::endpoint;
use crate::error::{BackendError, check_status};
use crate::google_oauth::credentials::AuthContext;
use crate::types::sheets::{
    AppendResponse, AppendUpdates, METADATA_FIELDS, SpreadsheetMetadata, SpreadsheetResponse,
    ValueRangeResponse,
};

const GET_OP: &str = "sheets.spreadsheets.get";
const READ_OP: &str = "sheets.values.get";
const APPEND_OP: &str = "sheets.values.append";

/// Stateless Sheets v4 calls; inputs are assumed validated.
#[derive(Clone)]
pub struct SheetsApi {
    http: reqwest::Client,
    base: Url,
}

impl SheetsApi {
    pub fn new(http: reqwest::Client, base: Url) -> Self {
        Self { http, base }
    }

    pub async fn get_metadata(
        &self,
        auth: &AuthContext,
        spreadsheet_id: &str,
    ) -> Result<SpreadsheetMetadata, BackendError> {
        let url = endpoint(GET_OP, &self.base, &["spreadsheets", spreadsheet_id])?;
        let token = auth.bearer().await?;
        let resp = self
            .http
            .get(url)
            .bearer_auth(token)
            .query(&[("fields", METADATA_FIELDS)])
            .send()
            .await
            .map_err(|e| BackendError::new(GET_OP, e))?;
        let raw: SpreadsheetResponse = decode(GET_OP, resp).await?;
        Ok(raw.into())
    }

    /// Returns the range echoed by the backend (A1 notation, normalized) and its rows.
    pub async fn read_values(
        &self,
        auth: &AuthContext,
        spreadsheet_id: &str,
        range: &str,
    ) -> Result<(Option<String>, Vec<Vec<Value>>), BackendError> {
        let url = endpoint(
            READ_OP,
            &self.base,
            &["spreadsheets", spreadsheet_id, "values", range],
        )?;
        let token = auth.bearer().await?;
        let resp = self
            .http
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| BackendError::new(READ_OP, e))?;
        let raw: ValueRangeResponse = decode(READ_OP, resp).await?;
        Ok((raw.range, raw.values))
    }

    /// Append rows with `USER_ENTERED` interpretation.
    pub async fn append_values(
        &self,
        auth: &AuthContext,
        spreadsheet_id: &str,
        range: &str,
        rows: &[Vec<Value>],
    ) -> Result<AppendUpdates, BackendError> {
        let target = format!("{range}:append");
        let url = endpoint(
            APPEND_OP,
            &self.base,
            &["spreadsheets", spreadsheet_id, "values", &target],
        )?;
        let token = auth.bearer().await?;
        let resp = self
            .http
            .post(url)
            .bearer_auth(token)
            .query(&[("valueInputOption", "USER_ENTERED")])
            .json(&json!({ "values": rows }))
            .send()
            .await
            .map_err(|e| BackendError::new(APPEND_OP, e))?;
        let raw: AppendResponse = decode(APPEND_OP, resp).await?;
        Ok(raw.updates)
    }
}

async fn decode<T>(op: &'static str, resp: reqwest::Response) -> Result<T, BackendError>
where
    T: for<'de> Deserialize<'de>,
{
    let resp = check_status(op, resp).await?;
    let bytes = resp.bytes().await.map_err(|e| BackendError::new(op, e))?;
    serde_json::from_slice(&bytes).map_err(|e| BackendError::new(op, e))
}
