pub mod drive_api;
pub mod sheets_api;

use crate::config::BasicConfig;
use crate::error::{BackendError, BackendErrorKind, FolioError};
use std::time::Duration;
use url::Url;

pub use drive_api::{DriveApi, DriveClient, ListRequest};
pub use sheets_api::SheetsApi;

/// Build the process-wide HTTP client.
pub fn build_http_client(cfg: &BasicConfig) -> Result<reqwest::Client, FolioError> {
    let mut builder = reqwest::Client::builder()
        .user_agent(cfg.user_agent.clone())
        .connect_timeout(Duration::from_secs(cfg.connect_timeout_secs))
        .timeout(Duration::from_secs(cfg.request_timeout_secs))
        .http2_adaptive_window(true);
    if let Some(proxy_url) = cfg.proxy.as_ref() {
        builder = builder.proxy(reqwest::Proxy::all(proxy_url.as_str())?);
    }
    Ok(builder.build()?)
}

/// `base` with `segments` appended as percent-encoded path segments.
pub(crate) fn endpoint(
    operation: &'static str,
    base: &Url,
    segments: &[&str],
) -> Result<Url, BackendError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| {
            BackendError::new(
                operation,
                BackendErrorKind::Endpoint(format!("{base} cannot be a base URL")),
            )
        })?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}
