use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};
use url::Url;

use crate::api::{self, DriveClient, SheetsApi};
use crate::config::Config;
use crate::error::{CredentialError, FolioError};
use crate::google_oauth::ALL_SCOPES;
use crate::google_oauth::credentials::AuthContext;
use crate::google_oauth::service::GoogleOauthService;
use crate::service::{credential_loader, search};
use crate::service::{
    CredentialResolver, LegibilityClassifier, ReindexTrigger, RequestContext, SearchSettings,
    SheetsGateway,
};
use crate::types::{
    AppendUpdates, FileEntry, GoogleProfile, SearchRequest, SpreadsheetMetadata, SpreadsheetRange,
    UserOAuthToken,
};

/// Process-scoped state: the shared HTTP client, the credential chain (which
/// owns the service-account singleton) and the background reindex worker.
///
/// Cheap to clone; clones share everything.
#[derive(Clone)]
pub struct FolioContext {
    inner: Arc<Inner>,
}

struct Inner {
    config: Config,
    http: reqwest::Client,
    resolver: CredentialResolver,
    oauth: Option<GoogleOauthService>,
    sheets: SheetsGateway,
    reindex: ReindexTrigger,
    classifier: LegibilityClassifier,
    settings: SearchSettings,
}

impl FolioContext {
    /// Build the context from configuration. Must run inside a tokio runtime.
    pub fn new(config: Config) -> Result<Self, FolioError> {
        let http = api::build_http_client(&config.basic)?;
        let oauth = match credential_loader::load_oauth_client(&config.credentials) {
            Some(secrets) => Some(GoogleOauthService::new(
                &secrets,
                config.credentials.redirect_uri.as_deref(),
                &config.endpoints,
                http.clone(),
            )?),
            None => {
                info!("no OAuth client configured; user sign-in is unavailable");
                None
            }
        };
        let resolver = CredentialResolver::from_config(&config, http.clone(), oauth.clone());
        Ok(Self::from_parts(config, http, resolver, oauth))
    }

    /// Assemble a context around an explicit resolver.
    pub fn from_parts(
        config: Config,
        http: reqwest::Client,
        resolver: CredentialResolver,
        oauth: Option<GoogleOauthService>,
    ) -> Self {
        let sheets = SheetsGateway::new(SheetsApi::new(
            http.clone(),
            config.endpoints.sheets_base.clone(),
        ));
        let classifier = LegibilityClassifier::from_config(&config.search);
        let settings = SearchSettings::from(&config.search);
        Self {
            inner: Arc::new(Inner {
                sheets,
                reindex: ReindexTrigger::spawn(),
                classifier,
                settings,
                resolver,
                oauth,
                http,
                config,
            }),
        }
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub async fn resolve(&self, ctx: &RequestContext) -> Result<AuthContext, FolioError> {
        self.inner.resolver.resolve(ctx).await
    }

    pub async fn search(
        &self,
        ctx: &RequestContext,
        request: &SearchRequest,
    ) -> Result<Vec<FileEntry>, FolioError> {
        request.validate()?;
        let auth = self.resolve(ctx).await?;
        let drive = DriveClient::new(
            self.inner.http.clone(),
            self.inner.config.endpoints.drive_base.clone(),
            auth,
        );
        search::run_validated(&drive, request, &self.inner.settings, &self.inner.classifier).await
    }

    pub async fn spreadsheet_metadata(
        &self,
        ctx: &RequestContext,
        spreadsheet_id: &str,
    ) -> Result<SpreadsheetMetadata, FolioError> {
        crate::error::require_non_empty("spreadsheet_id", spreadsheet_id)?;
        let auth = self.resolve(ctx).await?;
        self.inner.sheets.get_metadata(&auth, spreadsheet_id).await
    }

    pub async fn read_range(
        &self,
        ctx: &RequestContext,
        spreadsheet_id: &str,
        range: &str,
    ) -> Result<SpreadsheetRange, FolioError> {
        crate::error::require_non_empty("spreadsheet_id", spreadsheet_id)?;
        crate::error::require_non_empty("range", range)?;
        let auth = self.resolve(ctx).await?;
        self.inner.sheets.read_range(&auth, spreadsheet_id, range).await
    }

    pub async fn append_rows(
        &self,
        ctx: &RequestContext,
        spreadsheet_id: &str,
        range: &str,
        rows: &[Vec<Value>],
    ) -> Result<AppendUpdates, FolioError> {
        crate::error::require_non_empty("spreadsheet_id", spreadsheet_id)?;
        crate::error::require_non_empty("range", range)?;
        crate::service::sheets_gateway::validate_rows(rows)?;
        let auth = self.resolve(ctx).await?;
        self.inner
            .sheets
            .append_rows(&auth, spreadsheet_id, range, rows)
            .await
    }

    pub fn reindex(&self, file_id: &str) -> Result<(), FolioError> {
        Ok(self.inner.reindex.reindex(file_id)?)
    }

    /// Wait for the reindex worker to hand off every queued job, then stop it.
    pub async fn shutdown(&self) {
        self.inner.reindex.shutdown().await;
    }

    pub async fn fetch_profile(&self, ctx: &RequestContext) -> Result<GoogleProfile, FolioError> {
        if ctx.user_token.is_none() {
            return Err(CredentialError::UserTokenRequired.into());
        }
        let oauth = self.oauth()?;
        let auth = self.resolve(ctx).await?;
        oauth.fetch_profile(&auth).await
    }

    /// Consent URL for all scopes, plus its CSRF state.
    pub fn authorize_url(&self) -> Result<(Url, String), FolioError> {
        Ok(self.oauth()?.authorize_url(ALL_SCOPES))
    }

    pub async fn exchange_code(&self, code: &str) -> Result<UserOAuthToken, FolioError> {
        self.oauth()?.exchange_code(code).await
    }

    fn oauth(&self) -> Result<&GoogleOauthService, FolioError> {
        self.inner.oauth.as_ref().ok_or_else(|| {
            warn!("OAuth operation requested without a configured client");
            CredentialError::OauthClientMissing.into()
        })
    }
}
