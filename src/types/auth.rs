use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ValidationError;

/// Tokens shorter-lived than this are treated as already expired.
const EXPIRY_SKEW_SECS: i64 = 60;

/// Session-bound user token, created at authorization-callback time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserOAuthToken {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default)]
    pub expiry: Option<DateTime<Utc>>,
}

impl UserOAuthToken {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expiry {
            Some(expiry) => expiry - Duration::seconds(EXPIRY_SKEW_SECS) <= now,
            None => false,
        }
    }

    /// Build from a token-endpoint style payload.
    ///
    /// Accepts both `expires_in` (seconds from now) and `expiry_date`
    /// (epoch milliseconds, as stored by web session middleware), and a
    /// space-separated `scope` string or a `scopes` array.
    pub fn from_payload(payload: &Value) -> Result<Self, ValidationError> {
        let access_token = payload
            .get("access_token")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ValidationError::missing("access_token"))?
            .to_string();

        let refresh_token = payload
            .get("refresh_token")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .map(str::to_string);

        let scopes = match (payload.get("scope"), payload.get("scopes")) {
            (Some(Value::String(s)), _) => s.split_whitespace().map(str::to_string).collect(),
            (_, Some(Value::Array(items))) => items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        };

        let expiry = if let Some(secs) = payload.get("expires_in").and_then(Value::as_i64) {
            Some(Utc::now() + Duration::seconds(secs))
        } else if let Some(ms) = payload.get("expiry_date").and_then(Value::as_i64) {
            Utc.timestamp_millis_opt(ms).single()
        } else {
            payload
                .get("expiry")
                .and_then(Value::as_str)
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|dt| dt.with_timezone(&Utc))
        };

        Ok(Self {
            access_token,
            refresh_token,
            scopes,
            expiry,
        })
    }
}

/// Basic profile of the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoogleProfile {
    pub id: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub picture: Option<String>,
}
