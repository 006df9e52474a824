use crate::error::{BackendError, BackendErrorKind, check_status};
use crate::types::GoogleProfile;

use oauth2::{
    AuthUrl, AuthorizationCode, Client as OAuth2Client, ClientId, ClientSecret, CsrfToken,
    EndpointNotSet, EndpointSet, ExtraTokenFields, RedirectUrl, RefreshToken, Scope,
    StandardRevocableToken, StandardTokenResponse, TokenUrl,
    basic::{
        BasicErrorResponse, BasicRevocationErrorResponse, BasicTokenIntrospectionResponse,
        BasicTokenType,
    },
};
use serde::{Deserialize, Serialize};
use tracing::info;
use url::Url;

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Stateless Google OAuth endpoints.
pub(crate) struct GoogleOauthEndpoints;

impl GoogleOauthEndpoints {
    /// Consent URL requesting offline access for `scopes`.
    pub(crate) fn build_authorize_url(
        client: &GoogleOauth2Client,
        scopes: &[&str],
    ) -> (Url, CsrfToken) {
        client
            .authorize_url(CsrfToken::new_random)
            .add_scopes(scopes.iter().map(|s| Scope::new((*s).to_string())))
            .add_extra_param("access_type", "offline")
            .add_extra_param("prompt", "consent")
            .url()
    }

    pub(crate) async fn exchange_authorization_code(
        client: &GoogleOauth2Client,
        code: AuthorizationCode,
        http_client: &reqwest::Client,
    ) -> Result<GoogleTokenResponse, BackendError> {
        let token = client
            .exchange_code(code)
            .request_async(http_client)
            .await
            .map_err(|e| BackendError::new("oauth2.exchange_code", BackendErrorKind::from(e)))?;
        info!("Authorization code exchanged successfully");
        Ok(token)
    }

    /// Refresh an access token using a refresh token.
    pub(crate) async fn refresh_access_token(
        client: &GoogleOauth2Client,
        refresh_token: &str,
        http_client: &reqwest::Client,
    ) -> Result<GoogleTokenResponse, BackendError> {
        let token = client
            .exchange_refresh_token(&RefreshToken::new(refresh_token.to_string()))
            .request_async(http_client)
            .await
            .map_err(|e| BackendError::new("oauth2.refresh", BackendErrorKind::from(e)))?;
        info!("Access token refreshed successfully");
        Ok(token)
    }

    pub(crate) async fn fetch_userinfo(
        userinfo_url: &Url,
        access_token: &str,
        http_client: &reqwest::Client,
    ) -> Result<GoogleProfile, BackendError> {
        const OP: &str = "oauth2.userinfo";
        let resp = http_client
            .get(userinfo_url.clone())
            .bearer_auth(access_token)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| BackendError::new(OP, e))?;
        let resp = check_status(OP, resp).await?;
        let bytes = resp.bytes().await.map_err(|e| BackendError::new(OP, e))?;
        let profile: GoogleProfile =
            serde_json::from_slice(&bytes).map_err(|e| BackendError::new(OP, e))?;
        info!("Fetched user profile successfully");
        Ok(profile)
    }

    /// Trade a signed service-account assertion for an access token.
    pub(crate) async fn exchange_jwt_assertion(
        token_uri: &str,
        assertion: &str,
        http_client: &reqwest::Client,
    ) -> Result<AccessGrant, BackendError> {
        const OP: &str = "oauth2.jwt_bearer";
        let resp = http_client
            .post(token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion)])
            .send()
            .await
            .map_err(|e| BackendError::new(OP, e))?;
        decode_grant(OP, resp).await
    }

    /// Default service-account token from the compute metadata server.
    pub(crate) async fn fetch_metadata_token(
        metadata_host: &str,
        scopes: &[String],
        http_client: &reqwest::Client,
    ) -> Result<AccessGrant, BackendError> {
        const OP: &str = "metadata.token";
        let url = format!(
            "http://{}/computeMetadata/v1/instance/service-accounts/default/token",
            metadata_host.trim_end_matches('/')
        );
        let resp = http_client
            .get(url)
            .header("Metadata-Flavor", "Google")
            .query(&[("scopes", scopes.join(","))])
            .send()
            .await
            .map_err(|e| BackendError::new(OP, e))?;
        decode_grant(OP, resp).await
    }
}

async fn decode_grant(op: &'static str, resp: reqwest::Response) -> Result<AccessGrant, BackendError> {
    let resp = check_status(op, resp).await?;
    let bytes = resp.bytes().await.map_err(|e| BackendError::new(op, e))?;
    serde_json::from_slice(&bytes).map_err(|e| BackendError::new(op, e))
}

/// Build the Google OAuth2 client from client secrets.
pub(crate) fn build_oauth2_client(
    client_id: &str,
    client_secret: &str,
    auth_url: &Url,
    token_url: &Url,
    redirect_uri: Option<&str>,
) -> Result<GoogleOauth2Client, url::ParseError> {
    let client = OAuth2Client::new(ClientId::new(client_id.to_string()))
        .set_client_secret(ClientSecret::new(client_secret.to_string()))
        .set_auth_uri(AuthUrl::new(auth_url.as_str().to_string())?)
        .set_token_uri(TokenUrl::new(token_url.as_str().to_string())?);
    match redirect_uri {
        Some(uri) => Ok(client.set_redirect_uri(RedirectUrl::new(uri.to_string())?)),
        None => Ok(client),
    }
}

/// Minimal token grant (`access_token` + `expires_in`) from non-OAuth2-client flows.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct AccessGrant {
    pub access_token: String,
    #[serde(default = "default_expires_in")]
    pub expires_in: i64,
}

fn default_expires_in() -> i64 {
    3600
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub(crate) struct GoogleTokenField {
    #[serde(rename = "id_token")]
    pub id_token: Option<String>,
}
impl ExtraTokenFields for GoogleTokenField {}

pub(crate) type GoogleTokenResponse = StandardTokenResponse<GoogleTokenField, BasicTokenType>;

pub(crate) type GoogleOauth2Client = OAuth2Client<
    BasicErrorResponse,
    GoogleTokenResponse,
    BasicTokenIntrospectionResponse,
    StandardRevocableToken,
    BasicRevocationErrorResponse,
    EndpointSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointSet,
>;
