use crate::config::CredentialsConfig;
use crate::error::FolioError;
use crate::google_oauth::DEFAULT_REDIRECT_URI;
use crate::google_oauth::credentials::{AdcCredential, OAuthClientSecrets, ServiceAccountKey};
use serde_json::Value;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, info, warn};

/// Where a service-account key would come from, if anywhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySource {
    Inline(String),
    File(PathBuf),
}

/// Locate the configured service-account key without reading it.
pub fn service_account_source(cfg: &CredentialsConfig) -> Option<KeySource> {
    if let Some(raw) = cfg.service_account_json.as_ref().filter(|s| !s.trim().is_empty()) {
        return Some(KeySource::Inline(raw.clone()));
    }
    cfg.service_account_path
        .as_ref()
        .filter(|path| path.is_file())
        .map(|path| KeySource::File(path.clone()))
}

pub fn load_service_account(source: &KeySource) -> Result<ServiceAccountKey, FolioError> {
    let raw = match source {
        KeySource::Inline(raw) => raw.clone(),
        KeySource::File(path) => fs::read_to_string(path)?,
    };
    let key = ServiceAccountKey::from_json(&raw)?;
    info!(client_email = %key.client_email, "service account key loaded");
    Ok(key)
}

/// OAuth client secrets: the client file wins, then explicit id/secret settings.
pub fn load_oauth_client(cfg: &CredentialsConfig) -> Option<OAuthClientSecrets> {
    if let Some(path) = cfg.oauth_client_path.as_ref().filter(|p| p.is_file()) {
        match read_json(path).and_then(|v| OAuthClientSecrets::from_client_file(&v)) {
            Ok(secrets) => {
                debug!(path = %path.display(), "OAuth client loaded from file");
                return Some(secrets);
            }
            Err(e) => warn!(path = %path.display(), error = %e, "failed to load OAuth client file"),
        }
    }
    match (cfg.client_id.as_ref(), cfg.client_secret.as_ref()) {
        (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => {
            Some(OAuthClientSecrets {
                client_id: id.clone(),
                client_secret: secret.clone(),
                redirect_uris: vec![
                    cfg.redirect_uri
                        .clone()
                        .unwrap_or_else(|| DEFAULT_REDIRECT_URI.to_string()),
                ],
            })
        }
        _ => None,
    }
}

/// Candidate application-default credential files, in lookup order.
pub fn adc_candidates(cfg: &CredentialsConfig) -> Vec<PathBuf> {
    let mut out = Vec::new();
    if let Some(path) = cfg.adc_path.as_ref() {
        out.push(path.clone());
    }
    if let Some(path) = well_known_adc_path() {
        out.push(path);
    }
    out
}

fn well_known_adc_path() -> Option<PathBuf> {
    if cfg!(windows) {
        std::env::var_os("APPDATA")
            .map(|dir| PathBuf::from(dir).join("gcloud").join("application_default_credentials.json"))
    } else {
        std::env::var_os("HOME").map(|home| {
            PathBuf::from(home)
                .join(".config")
                .join("gcloud")
                .join("application_default_credentials.json")
        })
    }
}

/// First readable ADC file among `candidates`; unreadable files are skipped with a warning.
pub fn discover_adc(candidates: &[PathBuf]) -> Option<(PathBuf, AdcCredential)> {
    candidates
        .iter()
        .filter(|path| path.is_file())
        .find_map(|path| {
            load_adc(path)
                .inspect_err(|e| {
                    warn!(path = %path.display(), error = %e, "failed to load default credentials");
                })
                .ok()
                .map(|adc| (path.clone(), adc))
        })
}

fn load_adc(path: &Path) -> Result<AdcCredential, FolioError> {
    let contents = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

fn read_json(path: &Path) -> Result<Value, FolioError> {
    let contents = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}
