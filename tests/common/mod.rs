#![allow(dead_code)]

use folio::config::Config;
use folio::types::UserOAuthToken;
use folio::RequestContext;
use url::Url;
use wiremock::MockServer;

pub const USER_BEARER: &str = "Bearer ya29.user";

/// Config whose Google endpoints all point at `server`, with no on-disk credentials.
pub fn config_for(server: &MockServer) -> Config {
    let mut cfg = Config::default();
    let base = server.uri();
    cfg.endpoints.drive_base = Url::parse(&format!("{base}/drive/v3/")).unwrap();
    cfg.endpoints.sheets_base = Url::parse(&format!("{base}/v4/")).unwrap();
    cfg.endpoints.token_url = Url::parse(&format!("{base}/token")).unwrap();
    cfg.endpoints.userinfo_url = Url::parse(&format!("{base}/userinfo")).unwrap();
    cfg.credentials.service_account_path = None;
    cfg.credentials.oauth_client_path = None;
    cfg.credentials.adc_path = None;
    cfg.credentials.metadata_host = None;
    cfg
}

pub fn user_context() -> RequestContext {
    RequestContext::with_user_token(UserOAuthToken {
        access_token: "ya29.user".to_string(),
        refresh_token: None,
        scopes: vec!["https://www.googleapis.com/auth/drive.metadata.readonly".to_string()],
        expiry: None,
    })
}

pub fn service_account_json(server: &MockServer) -> String {
    serde_json::json!({
        "type": "service_account",
        "project_id": "folio-test",
        "private_key_id": "fixture-key",
        "private_key": include_str!("../fixtures/service_account_key.pem"),
        "client_email": "indexer@folio-test.iam.gserviceaccount.com",
        "token_uri": format!("{}/token", server.uri()),
    })
    .to_string()
}
