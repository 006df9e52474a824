pub mod api;
pub mod config;
pub mod context;
pub mod error;
pub mod google_oauth;
pub mod service;
pub mod types;

pub use config::Config;
pub use context::FolioContext;
pub use error::{BackendError, CredentialError, FolioError, ValidationError};
pub use google_oauth::credentials::{AuthContext, CredentialSource, Credentials};
pub use google_oauth::service::GoogleOauthService;
pub use service::RequestContext;
