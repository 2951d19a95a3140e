//! JSON Web Tokens for authenticating as a GitHub App.

use anyhow::{Context, Result};
use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde::Serialize;

/// Backdating applied to `iat` to tolerate clock drift.
const CLOCK_SKEW_SECS: i64 = 60;
/// GitHub rejects app tokens valid for more than ten minutes.
const LIFETIME_SECS: i64 = 600;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppClaims {
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
}

impl AppClaims {
    pub fn issued_at(app_id: &str, now: i64) -> Self {
        Self {
            iat: now - CLOCK_SKEW_SECS,
            exp: now + LIFETIME_SECS,
            iss: app_id.to_string(),
        }
    }
}

/// Signs an RS256 app token for `app_id` with the given PEM private key.
pub fn generate_jwt(app_id: &str, private_key_pem: &[u8]) -> Result<String> {
    let claims = AppClaims::issued_at(app_id, Utc::now().timestamp());
    let key = EncodingKey::from_rsa_pem(private_key_pem)
        .context("Failed to parse GitHub App private key")?;

    encode(&Header::new(Algorithm::RS256), &claims, &key).context("Failed to encode JWT")
}
