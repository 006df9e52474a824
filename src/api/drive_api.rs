use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use super::endpoint;
use crate::error::{BackendError, check_status};
use crate::google_oauth::credentials::AuthContext;
use crate::types::drive::DriveFileList;

const LIST_OP: &str = "drive.files.list";
const GET_OP: &str = "drive.files.get";

/// One `files.list` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRequest {
    pub query: String,
    pub fields: &'static str,
    pub page_size: u32,
    pub page_token: Option<String>,
    pub order_by: Option<&'static str>,
}

impl ListRequest {
    pub fn new(query: impl Into<String>, fields: &'static str, page_size: u32) -> Self {
        Self {
            query: query.into(),
            fields,
            page_size,
            page_token: None,
            order_by: None,
        }
    }

    pub fn ordered_by(mut self, order_by: Option<&'static str>) -> Self {
        self.order_by = order_by;
        self
    }

    pub fn next_page(&self, token: String) -> Self {
        Self {
            page_token: Some(token),
            ..self.clone()
        }
    }
}

/// The storage backend as seen by the search core.
#[async_trait]
pub trait DriveApi: Send + Sync {
    async fn list_files(&self, request: &ListRequest) -> Result<DriveFileList, BackendError>;

    /// Size in bytes as reported by the backend; `None` for files without stored content.
    async fn file_size(&self, file_id: &str) -> Result<Option<u64>, BackendError>;
}

/// Drive v3 over HTTP, authenticated by one resolved credential.
#[derive(Clone)]
pub struct DriveClient {
    http: reqwest::Client,
    base: Url,
    auth: AuthContext,
}

impl DriveClient {
    pub fn new(http: reqwest::Client, base: Url, auth: AuthContext) -> Self {
        Self { http, base, auth }
    }

    pub fn auth(&self) -> &AuthContext {
        &self.auth
    }

    async fn get_json<T>(&self, op: &'static str, url: Url, query: &[(&str, String)]) -> Result<T, BackendError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let token = self.auth.bearer().await?;
        let resp = self
            .http
            .get(url)
            .bearer_auth(token)
            .query(query)
            .send()
            .await
            .map_err(|e| BackendError::new(op, e))?;
        let resp = check_status(op, resp).await?;
        let bytes = resp.bytes().await.map_err(|e| BackendError::new(op, e))?;
        serde_json::from_slice(&bytes).map_err(|e| BackendError::new(op, e))
    }
}

#[derive(Deserialize)]
struct SizeOnly {
    size: Option<String>,
}

#[async_trait]
impl DriveApi for DriveClient {
    async fn list_files(&self, request: &ListRequest) -> Result<DriveFileList, BackendError> {
        let url = endpoint(LIST_OP, &self.base, &["files"])?;
        let mut query = vec![
            ("q", request.query.clone()),
            ("fields", request.fields.to_string()),
            ("pageSize", request.page_size.to_string()),
            ("includeItemsFromAllDrives", "true".to_string()),
            ("supportsAllDrives", "true".to_string()),
        ];
        if let Some(order_by) = request.order_by {
            query.push(("orderBy", order_by.to_string()));
        }
        if let Some(token) = request.page_token.as_ref() {
            query.push(("pageToken", token.clone()));
        }
        let page: DriveFileList = self.get_json(LIST_OP, url, &query).await?;
        debug!(
            q = %request.query,
            returned = page.files.len(),
            more = page.next_page_token.is_some(),
            "files.list page"
        );
        Ok(page)
    }

    async fn file_size(&self, file_id: &str) -> Result<Option<u64>, BackendError> {
        let url = endpoint(GET_OP, &self.base, &["files", file_id])?;
        let query = [
            ("fields", "size".to_string()),
            ("supportsAllDrives", "true".to_string()),
        ];
        let meta: SizeOnly = self.get_json(GET_OP, url, &query).await?;
        Ok(meta.size.and_then(|s| s.parse().ok()))
    }
}
