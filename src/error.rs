use oauth2::basic::BasicErrorResponseType;
use oauth2::reqwest::Error as ReqwestClientError;
use oauth2::{HttpClientError, RequestTokenError, StandardErrorResponse};
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum FolioError {
    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("configuration error: {0}")]
    Config(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Debug, Clone, ThisError)]
pub enum CredentialError {
    #[error("no credential source is configured (session token, service account or ambient)")]
    NoneConfigured,

    #[error("credential initialization failed: {0}")]
    InitializationFailed(String),

    #[error("operation requires a user OAuth token")]
    UserTokenRequired,

    #[error("OAuth client is not configured (client id/secret)")]
    OauthClientMissing,
}

/// A failed remote call, tagged with the operation that failed.
#[derive(Debug, ThisError)]
#[error("{operation} failed: {kind}")]
pub struct BackendError {
    pub operation: &'static str,
    #[source]
    pub kind: BackendErrorKind,
}

#[derive(Debug, ThisError)]
pub enum BackendErrorKind {
    #[error("HTTP request error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("upstream returned {status}: {message}")]
    Status { status: StatusCode, message: String },

    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("OAuth2 server error: {0}")]
    Oauth2Server(String),

    #[error("OAuth2 token request error: {0}")]
    Oauth2Token(String),

    #[error("credential material rejected: {0}")]
    Signing(String),

    #[error("invalid endpoint: {0}")]
    Endpoint(String),
}

impl BackendError {
    pub fn new(operation: &'static str, kind: impl Into<BackendErrorKind>) -> Self {
        Self {
            operation,
            kind: kind.into(),
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match &self.kind {
            BackendErrorKind::Status { status, .. } => Some(*status),
            BackendErrorKind::Transport(e) => e.status(),
            _ => None,
        }
    }
}

/// Caller-input problem, detected before any network call.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
#[error("invalid `{field}`: {reason}")]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }

    pub fn missing(field: &'static str) -> Self {
        Self::new(field, "is required")
    }
}

/// Require a non-blank string, returning it trimmed.
pub fn require_non_empty<'a>(field: &'static str, value: &'a str) -> Result<&'a str, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::missing(field));
    }
    Ok(trimmed)
}

pub type TokenRequestError = RequestTokenError<
    HttpClientError<ReqwestClientError>,
    StandardErrorResponse<BasicErrorResponseType>,
>;

impl From<TokenRequestError> for BackendErrorKind {
    fn from(e: TokenRequestError) -> Self {
        match e {
            RequestTokenError::ServerResponse(err) => {
                BackendErrorKind::Oauth2Server(err.error().to_string())
            }
            RequestTokenError::Request(req_e) => {
                BackendErrorKind::Oauth2Token(format!("request failed: {}", req_e))
            }
            RequestTokenError::Parse(parse_err, _body) => {
                BackendErrorKind::Decode(parse_err.into_inner())
            }
            RequestTokenError::Other(s) => BackendErrorKind::Oauth2Token(s),
        }
    }
}

/// Google API error envelope (`{"error": {"code", "message", "status"}}`).
#[derive(Deserialize, Debug)]
pub struct GoogleApiError {
    pub error: GoogleApiErrorBody,
}

#[derive(Deserialize, Debug)]
pub struct GoogleApiErrorBody {
    pub code: u32,
    pub message: String,
    #[serde(default)]
    pub status: Option<String>,
}

/// Turn a non-success response into a `BackendError`, keeping Google's message when present.
pub async fn check_status(
    operation: &'static str,
    resp: reqwest::Response,
) -> Result<reqwest::Response, BackendError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<GoogleApiError>(&body) {
        Ok(parsed) => match parsed.error.status {
            Some(s) => format!("{} ({})", parsed.error.message, s),
            None => parsed.error.message,
        },
        Err(_) if body.is_empty() => status
            .canonical_reason()
            .unwrap_or("unknown status")
            .to_string(),
        Err(_) => body,
    };
    Err(BackendError::new(
        operation,
        BackendErrorKind::Status { status, message },
    ))
}
