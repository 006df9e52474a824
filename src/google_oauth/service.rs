use super::credentials::{AuthContext, OAuthClientSecrets};
use super::endpoints::{
    GoogleOauth2Client, GoogleOauthEndpoints, GoogleTokenResponse, build_oauth2_client,
};
use crate::config::EndpointsConfig;
use crate::error::{CredentialError, FolioError};
use crate::types::{GoogleProfile, UserOAuthToken};

use chrono::{Duration, Utc};
use oauth2::{AuthorizationCode, TokenResponse};
use tracing::{debug, warn};
use url::Url;

/// Service layer composing the user-facing OAuth operations.
#[derive(Clone)]
pub struct GoogleOauthService {
    client: GoogleOauth2Client,
    http: reqwest::Client,
    userinfo_url: Url,
}

impl GoogleOauthService {
    /// `redirect_uri` only applies when the client secrets carry no redirect of their own.
    pub fn new(
        secrets: &OAuthClientSecrets,
        redirect_uri: Option<&str>,
        endpoints: &EndpointsConfig,
        http: reqwest::Client,
    ) -> Result<Self, FolioError> {
        let redirect = secrets.redirect_uri().or(redirect_uri);
        let client = build_oauth2_client(
            &secrets.client_id,
            &secrets.client_secret,
            &endpoints.auth_url,
            &endpoints.token_url,
            redirect,
        )?;
        Ok(Self {
            client,
            http,
            userinfo_url: endpoints.userinfo_url.clone(),
        })
    }

    /// Consent URL plus the CSRF state the caller must check on callback.
    pub fn authorize_url(&self, scopes: &[&str]) -> (Url, String) {
        let (url, csrf) = GoogleOauthEndpoints::build_authorize_url(&self.client, scopes);
        (url, csrf.secret().to_string())
    }

    /// Exchange an authorization-callback code for a session token.
    pub async fn exchange_code(&self, code: &str) -> Result<UserOAuthToken, FolioError> {
        let code = crate::error::require_non_empty("code", code)?;
        let resp = GoogleOauthEndpoints::exchange_authorization_code(
            &self.client,
            AuthorizationCode::new(code.to_string()),
            &self.http,
        )
        .await?;
        let token = user_token_from_response(&resp, None);
        if token.refresh_token.is_none() {
            warn!("OAuth response missing refresh_token; offline refresh will not be possible");
        }
        Ok(token)
    }

    /// Refresh an expired session token, keeping the old refresh token if none is returned.
    pub async fn refresh(&self, token: &UserOAuthToken) -> Result<UserOAuthToken, FolioError> {
        let refresh_token = token
            .refresh_token
            .as_deref()
            .ok_or(CredentialError::UserTokenRequired)?;
        let resp =
            GoogleOauthEndpoints::refresh_access_token(&self.client, refresh_token, &self.http)
                .await?;
        let mut refreshed = user_token_from_response(&resp, token.refresh_token.clone());
        if refreshed.scopes.is_empty() {
            refreshed.scopes = token.scopes.clone();
        }
        debug!(scopes = refreshed.scopes.len(), "session token refreshed");
        Ok(refreshed)
    }

    /// Profile of the signed-in user; requires a user-token context.
    pub async fn fetch_profile(&self, auth: &AuthContext) -> Result<GoogleProfile, FolioError> {
        if !auth.is_user() {
            return Err(CredentialError::UserTokenRequired.into());
        }
        let token = auth.bearer().await?;
        Ok(GoogleOauthEndpoints::fetch_userinfo(&self.userinfo_url, &token, &self.http).await?)
    }
}

fn user_token_from_response(
    resp: &GoogleTokenResponse,
    fallback_refresh: Option<String>,
) -> UserOAuthToken {
    UserOAuthToken {
        access_token: resp.access_token().secret().to_string(),
        refresh_token: resp
            .refresh_token()
            .map(|r| r.secret().to_string())
            .or(fallback_refresh),
        scopes: resp
            .scopes()
            .map(|scopes| scopes.iter().map(|s| s.to_string()).collect())
            .unwrap_or_default(),
        expiry: resp
            .expires_in()
            .and_then(|d| Duration::from_std(d).ok())
            .map(|d| Utc::now() + d),
    }
}
