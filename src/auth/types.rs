// Authentication types

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Cookie holding the access token
pub const ACCESS_TOKEN_COOKIE: &str = "token";

/// Cookie holding the refresh token
pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";

/// Access token cookie lifetime
pub fn access_token_ttl() -> Duration {
    Duration::days(1)
}

/// Refresh token cookie lifetime
pub fn refresh_token_ttl() -> Duration {
    Duration::days(365)
}

/// First 20 characters of a token, for logs
pub fn token_prefix(token: &str) -> &str {
    match token.char_indices().nth(20) {
        Some((end, _)) => &token[..end],
        None => token,
    }
}

/// Access/refresh token pair issued at login
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// A single stored cookie with its expiry
#[derive(Debug, Clone)]
pub struct StoredCookie {
    pub value: String,
    pub expires_at: DateTime<Utc>,
}

impl StoredCookie {
    pub fn new(value: impl Into<String>, ttl: Duration) -> Self {
        Self {
            value: value.into(),
            expires_at: Utc::now() + ttl,
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

/// Body of `POST /auth/refresh`
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Response of `POST /auth/refresh`
#[derive(Deserialize)]
pub struct RefreshResponse {
    pub data: RefreshedToken,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshedToken {
    pub access_token: String,
}

/// Body of `POST /auth/login`
#[derive(Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Response of `POST /auth/login`
#[derive(Deserialize)]
pub struct LoginResponse {
    pub data: CredentialPair,
}
