use crate::error::FolioError;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

pub const CONFIG_FILE: &str = "folio.toml";
pub const ENV_PREFIX: &str = "FOLIO_";

/// Variables understood by earlier deployments, mapped onto config keys.
const LEGACY_ENV: &[(&str, &str)] = &[
    ("CLIENT_ID", "credentials.client_id"),
    ("CLIENT_SECRET", "credentials.client_secret"),
    ("REDIRECT_URI", "credentials.redirect_uri"),
    ("GOOGLE_APPLICATION_CREDENTIALS", "credentials.adc_path"),
];

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub basic: BasicConfig,
    #[serde(default)]
    pub credentials: CredentialsConfig,
    #[serde(default)]
    pub endpoints: EndpointsConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BasicConfig {
    pub loglevel: String,
    pub proxy: Option<Url>,
    pub user_agent: String,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
}

impl Default for BasicConfig {
    fn default() -> Self {
        Self {
            loglevel: "info".to_string(),
            proxy: None,
            user_agent: concat!("folio/", env!("CARGO_PKG_VERSION")).to_string(),
            connect_timeout_secs: 5,
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CredentialsConfig {
    /// Service-account key file; ignored when absent on disk.
    pub service_account_path: Option<PathBuf>,
    /// Inline service-account key JSON, takes precedence over the file.
    pub service_account_json: Option<String>,
    /// OAuth client file in the `{"web": {...}}` / `{"installed": {...}}` shape.
    pub oauth_client_path: Option<PathBuf>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    /// Callback URL for the id/secret client; a client file's own redirect wins.
    pub redirect_uri: Option<String>,
    /// Application-default credential file (authorized_user or service_account).
    pub adc_path: Option<PathBuf>,
    /// Compute metadata server host; the source is disabled when unset.
    pub metadata_host: Option<String>,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            service_account_path: Some(PathBuf::from("service-account.json")),
            service_account_json: None,
            oauth_client_path: Some(PathBuf::from("credentials.json")),
            client_id: None,
            client_secret: None,
            redirect_uri: None,
            adc_path: None,
            metadata_host: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EndpointsConfig {
    pub drive_base: Url,
    pub sheets_base: Url,
    pub auth_url: Url,
    pub token_url: Url,
    pub userinfo_url: Url,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            drive_base: parse_static("https://www.googleapis.com/drive/v3/"),
            sheets_base: parse_static("https://sheets.googleapis.com/v4/"),
            auth_url: parse_static("https://accounts.google.com/o/oauth2/v2/auth"),
            token_url: parse_static("https://oauth2.googleapis.com/token"),
            userinfo_url: parse_static("https://www.googleapis.com/oauth2/v2/userinfo"),
        }
    }
}

fn parse_static(raw: &'static str) -> Url {
    Url::parse(raw).unwrap_or_else(|e| panic!("built-in endpoint {raw} is invalid: {e}"))
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchConfig {
    pub default_page_size: u32,
    pub folder_page_size: u32,
    pub probe_concurrency: usize,
    pub probe_rate_per_second: Option<u32>,
    pub max_folders: Option<usize>,
    pub max_crawl_secs: Option<u64>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_page_size: 20,
            folder_page_size: 100,
            probe_concurrency: 8,
            probe_rate_per_second: None,
            max_folders: Some(10_000),
            max_crawl_secs: None,
        }
    }
}

impl SearchConfig {
    pub fn max_crawl_time(&self) -> Option<Duration> {
        self.max_crawl_secs.map(Duration::from_secs)
    }
}

impl Config {
    /// Defaults, then `folio.toml`, then legacy variables, then `FOLIO_*`.
    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(CONFIG_FILE))
            .merge(legacy_env())
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn load() -> Result<Self, FolioError> {
        Self::figment()
            .extract()
            .map_err(|e| FolioError::Config(Box::new(e)))
    }
}

fn legacy_env() -> Env {
    let names: Vec<&str> = LEGACY_ENV.iter().map(|(name, _)| *name).collect();
    Env::raw().only(&names).map(|key| {
        LEGACY_ENV
            .iter()
            .find(|(name, _)| key.as_str().eq_ignore_ascii_case(name))
            .map(|(_, target)| *target)
            .unwrap_or("unmapped")
            .into()
    })
}
