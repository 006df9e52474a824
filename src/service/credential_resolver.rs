use crate::config::{Config, EndpointsConfig};
use crate::error::{CredentialError, FolioError};
use crate::google_oauth::credentials::{
    AdcCredential, AuthContext, CredentialSource, Credentials, OAuthClientSecrets,
    ServiceAccountSession,
};
use crate::google_oauth::endpoints::GoogleOauthEndpoints;
use crate::google_oauth::service::GoogleOauthService;
use crate::google_oauth::service_scopes;
use crate::service::credential_loader::{self, KeySource};
use crate::types::UserOAuthToken;

use async_trait::async_trait;
use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, error, info, warn};

/// Per-call inputs to credential resolution, supplied by the caller's session layer.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub user_token: Option<UserOAuthToken>,
}

impl RequestContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn with_user_token(token: UserOAuthToken) -> Self {
        Self {
            user_token: Some(token),
        }
    }
}

/// One credential source. `Ok(None)` means "not applicable, try the next one".
#[async_trait]
pub trait CredentialStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn resolve(&self, ctx: &RequestContext) -> Result<Option<AuthContext>, FolioError>;
}

/// Ordered strategy list, evaluated short-circuit.
pub struct CredentialResolver {
    strategies: Vec<Box<dyn CredentialStrategy>>,
}

impl CredentialResolver {
    pub fn new(strategies: Vec<Box<dyn CredentialStrategy>>) -> Self {
        Self { strategies }
    }

    /// Session token, then service account, then ambient credentials.
    pub fn from_config(
        cfg: &Config,
        http: reqwest::Client,
        oauth: Option<GoogleOauthService>,
    ) -> Self {
        let key_source = credential_loader::service_account_source(&cfg.credentials);
        match &key_source {
            Some(KeySource::File(path)) => {
                info!(path = %path.display(), "service account key file detected")
            }
            Some(KeySource::Inline(_)) => info!("inline service account key detected"),
            None => debug!("no service account key configured"),
        }
        Self::new(vec![
            Box::new(SessionTokenStrategy::new(oauth)),
            Box::new(ServiceAccountStrategy::new(key_source, http.clone())),
            Box::new(AmbientStrategy::new(
                credential_loader::adc_candidates(&cfg.credentials),
                cfg.credentials.metadata_host.clone(),
                cfg.endpoints.clone(),
                http,
            )),
        ])
    }

    pub async fn resolve(&self, ctx: &RequestContext) -> Result<AuthContext, FolioError> {
        for strategy in &self.strategies {
            if let Some(auth) = strategy.resolve(ctx).await? {
                debug!(strategy = strategy.name(), source = %auth.source(), "credential resolved");
                return Ok(auth);
            }
        }
        warn!("no credential source matched");
        Err(CredentialError::NoneConfigured.into())
    }
}

/// Turn concrete credential material into a callable context.
pub async fn establish(
    credentials: Credentials,
    source: CredentialSource,
    http: &reqwest::Client,
) -> Result<AuthContext, FolioError> {
    match credentials {
        Credentials::UserOAuthToken(token) => Ok(AuthContext::from_access_token(
            source,
            token.access_token,
            token.scopes,
        )),
        Credentials::ServiceAccountKey(key) => {
            let session = ServiceAccountSession::start(key, service_scopes(), http.clone()).await?;
            Ok(AuthContext::from_session(source, Arc::new(session)))
        }
    }
}

/// Rehydrates the caller's session-bound user token, refreshing it when expired.
pub struct SessionTokenStrategy {
    oauth: Option<GoogleOauthService>,
}

impl SessionTokenStrategy {
    pub fn new(oauth: Option<GoogleOauthService>) -> Self {
        Self { oauth }
    }
}

#[async_trait]
impl CredentialStrategy for SessionTokenStrategy {
    fn name(&self) -> &'static str {
        "session_token"
    }

    async fn resolve(&self, ctx: &RequestContext) -> Result<Option<AuthContext>, FolioError> {
        let Some(token) = ctx.user_token.as_ref() else {
            return Ok(None);
        };
        let token = if token.is_expired(Utc::now()) {
            match (&self.oauth, token.refresh_token.is_some()) {
                (Some(oauth), true) => oauth.refresh(token).await?,
                _ => {
                    warn!("session token expired and cannot be refreshed; using it as-is");
                    token.clone()
                }
            }
        } else {
            token.clone()
        };
        Ok(Some(AuthContext::from_access_token(
            CredentialSource::UserToken,
            token.access_token,
            token.scopes,
        )))
    }
}

type SessionCell = OnceCell<Result<Arc<ServiceAccountSession>, CredentialError>>;

/// Process-wide service-account handle, created at most once on first use.
///
/// An initialization failure is memoized: every later call reports the same
/// `InitializationFailed` until the process restarts.
pub struct ServiceAccountStrategy {
    source: Option<KeySource>,
    http: reqwest::Client,
    session: Arc<SessionCell>,
}

impl ServiceAccountStrategy {
    pub fn new(source: Option<KeySource>, http: reqwest::Client) -> Self {
        Self {
            source,
            http,
            session: Arc::new(OnceCell::new()),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.session.initialized()
    }

    async fn initialize(
        source: &KeySource,
        http: &reqwest::Client,
    ) -> Result<Arc<ServiceAccountSession>, FolioError> {
        let key = credential_loader::load_service_account(source)?;
        let session = ServiceAccountSession::start(key, service_scopes(), http.clone()).await?;
        Ok(Arc::new(session))
    }
}

#[async_trait]
impl CredentialStrategy for ServiceAccountStrategy {
    fn name(&self) -> &'static str {
        "service_account"
    }

    async fn resolve(&self, _ctx: &RequestContext) -> Result<Option<AuthContext>, FolioError> {
        let Some(source) = self.source.as_ref() else {
            return Ok(None);
        };
        let session = self
            .session
            .get_or_init(|| async {
                Self::initialize(source, &self.http).await.map_err(|e| {
                    error!(error = %e, "service account initialization failed");
                    CredentialError::InitializationFailed(e.to_string())
                })
            })
            .await;
        match session {
            Ok(session) => Ok(Some(AuthContext::from_session(
                CredentialSource::ServiceAccount,
                session.clone(),
            ))),
            Err(e) => Err(e.clone().into()),
        }
    }
}

/// Application-default credentials: ADC file, then the compute metadata server.
pub struct AmbientStrategy {
    adc_candidates: Vec<PathBuf>,
    metadata_host: Option<String>,
    endpoints: EndpointsConfig,
    http: reqwest::Client,
}

impl AmbientStrategy {
    pub fn new(
        adc_candidates: Vec<PathBuf>,
        metadata_host: Option<String>,
        endpoints: EndpointsConfig,
        http: reqwest::Client,
    ) -> Self {
        Self {
            adc_candidates,
            metadata_host,
            endpoints,
            http,
        }
    }
}

#[async_trait]
impl CredentialStrategy for AmbientStrategy {
    fn name(&self) -> &'static str {
        "ambient"
    }

    async fn resolve(&self, _ctx: &RequestContext) -> Result<Option<AuthContext>, FolioError> {
        if let Some((path, adc)) = credential_loader::discover_adc(&self.adc_candidates) {
            debug!(path = %path.display(), "using application default credentials");
            let auth = match adc {
                AdcCredential::AuthorizedUser {
                    client_id,
                    client_secret,
                    refresh_token,
                } => {
                    let secrets = OAuthClientSecrets {
                        client_id,
                        client_secret,
                        redirect_uris: Vec::new(),
                    };
                    let oauth =
                        GoogleOauthService::new(&secrets, None, &self.endpoints, self.http.clone())?;
                    let seed = UserOAuthToken {
                        access_token: String::new(),
                        refresh_token: Some(refresh_token),
                        scopes: Vec::new(),
                        expiry: None,
                    };
                    let token = oauth.refresh(&seed).await?;
                    establish(
                        Credentials::UserOAuthToken(token),
                        CredentialSource::Ambient,
                        &self.http,
                    )
                    .await?
                }
                AdcCredential::ServiceAccount(key) => {
                    establish(
                        Credentials::ServiceAccountKey(key),
                        CredentialSource::Ambient,
                        &self.http,
                    )
                    .await?
                }
            };
            return Ok(Some(auth));
        }

        if let Some(host) = self.metadata_host.as_deref() {
            let scopes = service_scopes();
            let grant =
                GoogleOauthEndpoints::fetch_metadata_token(host, &scopes, &self.http).await?;
            debug!(metadata_host = host, "using compute metadata credentials");
            return Ok(Some(AuthContext::from_access_token(
                CredentialSource::Ambient,
                grant.access_token,
                scopes,
            )));
        }

        Ok(None)
    }
}
