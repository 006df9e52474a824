use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use rsa::RsaPrivateKey;
use rsa::pkcs1v15::SigningKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::signature::{SignatureEncoding, Signer};
use serde::Serialize;
use sha2::Sha256;

use crate::error::BackendErrorKind;

/// Lifetime Google accepts for a self-signed assertion.
pub const ASSERTION_LIFETIME_SECS: i64 = 3600;

#[derive(Serialize)]
struct Header<'a> {
    alg: &'static str,
    typ: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    kid: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub struct AssertionClaims<'a> {
    pub iss: &'a str,
    pub scope: String,
    pub aud: &'a str,
    pub iat: i64,
    pub exp: i64,
}

impl<'a> AssertionClaims<'a> {
    pub fn new(issuer: &'a str, scopes: &[String], audience: &'a str, now: DateTime<Utc>) -> Self {
        let iat = now.timestamp();
        Self {
            iss: issuer,
            scope: scopes.join(" "),
            aud: audience,
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        }
    }
}

/// RS256 signer for service-account JWT bearer assertions.
pub struct AssertionSigner {
    key: SigningKey<Sha256>,
    key_id: Option<String>,
}

impl AssertionSigner {
    pub fn from_pem(pem: &str, key_id: Option<String>) -> Result<Self, BackendErrorKind> {
        let private_key = RsaPrivateKey::from_pkcs8_pem(pem)
            .map_err(|e| BackendErrorKind::Signing(format!("invalid private key: {e}")))?;
        Ok(Self {
            key: SigningKey::<Sha256>::new(private_key),
            key_id,
        })
    }

    pub fn sign(&self, claims: &AssertionClaims<'_>) -> Result<String, BackendErrorKind> {
        let header = Header {
            alg: "RS256",
            typ: "JWT",
            kid: self.key_id.as_deref(),
        };
        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header)?),
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims)?)
        );
        let signature = self
            .key
            .try_sign(signing_input.as_bytes())
            .map_err(|e| BackendErrorKind::Signing(e.to_string()))?;
        Ok(format!(
            "{}.{}",
            signing_input,
            URL_SAFE_NO_PAD.encode(signature.to_bytes())
        ))
    }
}

impl std::fmt::Debug for AssertionSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssertionSigner")
            .field("key_id", &self.key_id)
            .finish_non_exhaustive()
    }
}
