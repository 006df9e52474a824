use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::endpoints::GoogleOauthEndpoints;
use super::jwt::{AssertionClaims, AssertionSigner};
use crate::error::{BackendError, FolioError, ValidationError};
use crate::types::UserOAuthToken;

/// Re-mint access tokens this long before they lapse.
const TOKEN_REFRESH_MARGIN_SECS: i64 = 120;

/// Service-account key material, in Google's downloadable JSON key format.
#[derive(Clone, Deserialize, Serialize)]
pub struct ServiceAccountKey {
    #[serde(rename = "type", default)]
    pub key_type: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub private_key_id: Option<String>,
    pub private_key: String,
    pub client_email: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("project_id", &self.project_id)
            .field("client_email", &self.client_email)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

impl ServiceAccountKey {
    pub fn from_json(raw: &str) -> Result<Self, FolioError> {
        let key: ServiceAccountKey = serde_json::from_str(raw)?;
        if let Some(kind) = key.key_type.as_deref()
            && kind != "service_account"
        {
            return Err(ValidationError::new(
                "service_account",
                format!("expected key type `service_account`, found `{kind}`"),
            )
            .into());
        }
        Ok(key)
    }
}

/// OAuth client identity used for consent URLs, code exchange and refresh.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct OAuthClientSecrets {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
}

impl OAuthClientSecrets {
    /// Parse Google's `credentials.json` (`{"web": {...}}` or `{"installed": {...}}`).
    pub fn from_client_file(value: &Value) -> Result<Self, FolioError> {
        let inner = value
            .get("web")
            .or_else(|| value.get("installed"))
            .ok_or_else(|| ValidationError::new("oauth_client", "expected a `web` or `installed` section"))?;
        Ok(serde_json::from_value(inner.clone())?)
    }

    pub fn redirect_uri(&self) -> Option<&str> {
        self.redirect_uris.first().map(String::as_str)
    }
}

/// Contents of an application-default credential file.
#[derive(Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AdcCredential {
    AuthorizedUser {
        client_id: String,
        client_secret: String,
        refresh_token: String,
    },
    ServiceAccount(ServiceAccountKey),
}

impl fmt::Debug for AdcCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AuthorizedUser { client_id, .. } => f
                .debug_struct("AuthorizedUser")
                .field("client_id", client_id)
                .finish_non_exhaustive(),
            Self::ServiceAccount(key) => f.debug_tuple("ServiceAccount").field(key).finish(),
        }
    }
}

/// Exactly one credential is active per request context.
#[derive(Debug, Clone)]
pub enum Credentials {
    UserOAuthToken(UserOAuthToken),
    ServiceAccountKey(ServiceAccountKey),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialSource {
    UserToken,
    ServiceAccount,
    Ambient,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UserToken => f.write_str("user_token"),
            Self::ServiceAccount => f.write_str("service_account"),
            Self::Ambient => f.write_str("ambient"),
        }
    }
}

#[derive(Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - Duration::seconds(TOKEN_REFRESH_MARGIN_SECS) > now
    }
}

/// Long-lived service-account handle: signs assertions and keeps the current access token.
pub struct ServiceAccountSession {
    key: ServiceAccountKey,
    signer: AssertionSigner,
    scopes: Vec<String>,
    http: reqwest::Client,
    token: Mutex<CachedToken>,
}

impl ServiceAccountSession {
    /// Parse the key and mint the first access token.
    pub async fn start(
        key: ServiceAccountKey,
        scopes: Vec<String>,
        http: reqwest::Client,
    ) -> Result<Self, BackendError> {
        let signer = AssertionSigner::from_pem(&key.private_key, key.private_key_id.clone())
            .map_err(|kind| BackendError::new("oauth2.jwt_bearer", kind))?;
        let first = mint(&key, &signer, &scopes, &http).await?;
        info!(
            client_email = %key.client_email,
            scopes = scopes.len(),
            "service account session established"
        );
        Ok(Self {
            key,
            signer,
            scopes,
            http,
            token: Mutex::new(first),
        })
    }

    pub fn client_email(&self) -> &str {
        &self.key.client_email
    }

    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    pub async fn access_token(&self) -> Result<String, BackendError> {
        let mut cached = self.token.lock().await;
        if !cached.is_fresh(Utc::now()) {
            debug!(client_email = %self.key.client_email, "service account token expiring; re-minting");
            *cached = mint(&self.key, &self.signer, &self.scopes, &self.http).await?;
        }
        Ok(cached.access_token.clone())
    }
}

async fn mint(
    key: &ServiceAccountKey,
    signer: &AssertionSigner,
    scopes: &[String],
    http: &reqwest::Client,
) -> Result<CachedToken, BackendError> {
    let now = Utc::now();
    let claims = AssertionClaims::new(&key.client_email, scopes, &key.token_uri, now);
    let assertion = signer
        .sign(&claims)
        .map_err(|kind| BackendError::new("oauth2.jwt_bearer", kind))?;
    let grant = GoogleOauthEndpoints::exchange_jwt_assertion(&key.token_uri, &assertion, http).await?;
    Ok(CachedToken {
        access_token: grant.access_token,
        expires_at: now + Duration::seconds(grant.expires_in),
    })
}

#[derive(Clone)]
enum TokenHandle {
    Static(Arc<str>),
    ServiceAccount(Arc<ServiceAccountSession>),
}

/// A resolved, ready-to-call credential plus the scopes it was issued with.
#[derive(Clone)]
pub struct AuthContext {
    source: CredentialSource,
    scopes: Vec<String>,
    token: TokenHandle,
}

impl AuthContext {
    pub fn from_access_token(
        source: CredentialSource,
        access_token: impl Into<Arc<str>>,
        scopes: Vec<String>,
    ) -> Self {
        Self {
            source,
            scopes,
            token: TokenHandle::Static(access_token.into()),
        }
    }

    pub fn from_session(source: CredentialSource, session: Arc<ServiceAccountSession>) -> Self {
        Self {
            source,
            scopes: session.scopes().to_vec(),
            token: TokenHandle::ServiceAccount(session),
        }
    }

    pub fn source(&self) -> CredentialSource {
        self.source
    }

    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    pub fn is_user(&self) -> bool {
        self.source == CredentialSource::UserToken
    }

    /// Current bearer token for an outgoing call.
    pub async fn bearer(&self) -> Result<String, BackendError> {
        match &self.token {
            TokenHandle::Static(token) => Ok(token.to_string()),
            TokenHandle::ServiceAccount(session) => session.access_token().await,
        }
    }

    /// True when both contexts share the same underlying service-account session.
    pub fn shares_session_with(&self, other: &AuthContext) -> bool {
        match (&self.token, &other.token) {
            (TokenHandle::ServiceAccount(a), TokenHandle::ServiceAccount(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for AuthContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthContext")
            .field("source", &self.source)
            .field("scopes", &self.scopes)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn client_file_accepts_web_and_installed() {
        let web = json!({"web": {"client_id": "id", "client_secret": "s", "redirect_uris": ["http://localhost/cb"]}});
        let parsed = OAuthClientSecrets::from_client_file(&web).unwrap();
        assert_eq!(parsed.redirect_uri(), Some("http://localhost/cb"));

        let installed = json!({"installed": {"client_id": "id", "client_secret": "s"}});
        assert!(OAuthClientSecrets::from_client_file(&installed).is_ok());
        assert!(OAuthClientSecrets::from_client_file(&json!({"other": {}})).is_err());
    }

    #[test]
    fn adc_file_is_tagged_by_type() {
        let raw = r#"{"type":"authorized_user","client_id":"c","client_secret":"s","refresh_token":"r"}"#;
        let adc: AdcCredential = serde_json::from_str(raw).unwrap();
        assert!(matches!(adc, AdcCredential::AuthorizedUser { .. }));
    }

    #[test]
    fn wrong_key_type_is_rejected() {
        let raw = r#"{"type":"authorized_user","private_key":"k","client_email":"e"}"#;
        assert!(ServiceAccountKey::from_json(raw).is_err());
    }

    #[test]
    fn debug_output_hides_tokens() {
        let auth = AuthContext::from_access_token(CredentialSource::UserToken, "ya29.secret", vec![]);
        assert!(!format!("{auth:?}").contains("ya29.secret"));
    }
}
