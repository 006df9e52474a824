//! Google credential material and the OAuth2 endpoints that turn it into bearer tokens.

pub mod credentials;
pub(crate) mod endpoints;
pub mod jwt;
pub mod service;

pub const DRIVE_METADATA_READONLY: &str = "https://www.googleapis.com/auth/drive.metadata.readonly";
pub const DRIVE_READONLY: &str = "https://www.googleapis.com/auth/drive.readonly";
pub const SPREADSHEETS: &str = "https://www.googleapis.com/auth/spreadsheets";
pub const USERINFO_PROFILE: &str = "https://www.googleapis.com/auth/userinfo.profile";
pub const USERINFO_EMAIL: &str = "https://www.googleapis.com/auth/userinfo.email";

/// Callback used by an id/secret client when no redirect is configured.
pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:3000/auth/google/callback";

/// Drive and Sheets access requested from users.
pub const DRIVE_SCOPES: &[&str] = &[DRIVE_METADATA_READONLY, SPREADSHEETS];
/// Name, email and picture of the signed-in user.
pub const USER_PROFILE_SCOPES: &[&str] = &[USERINFO_PROFILE, USERINFO_EMAIL];
/// Everything the consent screen asks for.
pub const ALL_SCOPES: &[&str] = &[
    DRIVE_METADATA_READONLY,
    SPREADSHEETS,
    USERINFO_PROFILE,
    USERINFO_EMAIL,
];
/// Scopes issued to service-account and ambient credentials.
pub const SERVICE_SCOPES: &[&str] = &[DRIVE_READONLY, SPREADSHEETS];

pub fn service_scopes() -> Vec<String> {
    SERVICE_SCOPES.iter().map(|s| s.to_string()).collect()
}
