//! Admin session cookie.
//!
//! The cookie carries a single claim, "is admin", until it expires. Its value
//! is `<expiry unix seconds>.<hex HMAC-SHA256>` so it cannot be forged without
//! the signing key.

use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{DateTime, TimeZone, Utc};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};

use crate::config::Config;
use crate::error::AppError;
use crate::AppState;

pub const SESSION_COOKIE: &str = "auth_session";
pub const SESSION_TTL_SECS: i64 = 60 * 60 * 24;

type HmacSha256 = Hmac<Sha256>;

/// What the request's cookie says about the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Missing,
    Invalid,
    Admin(AdminClaim),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdminClaim {
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct SessionCodec {
    key: Arc<[u8]>,
}

impl std::fmt::Debug for SessionCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCodec")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

impl SessionCodec {
    pub fn new(key: &[u8]) -> Self {
        Self { key: key.into() }
    }

    /// `SESSION_SECRET` when set, else a key derived from the admin password
    /// (so changing the password ends every session), else a per-process
    /// random key.
    pub fn from_config(config: &Config) -> Self {
        if let Some(secret) = &config.session_secret {
            return Self::new(secret.expose_secret().as_bytes());
        }
        if let Some(password) = &config.admin_password {
            let mut hasher = Sha256::new();
            hasher.update(b"auth_session:");
            hasher.update(password.expose_secret().as_bytes());
            return Self::new(&hasher.finalize());
        }
        let random: Vec<u8> = [uuid::Uuid::new_v4(), uuid::Uuid::new_v4()]
            .iter()
            .flat_map(|id| id.into_bytes())
            .collect();
        Self::new(&random)
    }

    fn signature(&self, expires: i64) -> Option<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(&self.key).ok()?;
        mac.update(format!("admin:{expires}").as_bytes());
        Some(mac)
    }

    /// Session cookie asserting the admin claim for the next 24 hours.
    pub fn encode(&self, now: DateTime<Utc>) -> Option<Cookie<'static>> {
        let expires = now.timestamp() + SESSION_TTL_SECS;
        let signature = hex::encode(self.signature(expires)?.finalize().into_bytes());

        Some(
            Cookie::build((SESSION_COOKIE, format!("{expires}.{signature}")))
                .http_only(true)
                .secure(true)
                .same_site(SameSite::Strict)
                .path("/")
                .max_age(time::Duration::seconds(SESSION_TTL_SECS))
                .build(),
        )
    }

    /// Checks a raw cookie value. Never fails: anything unexpected is `None`.
    pub fn verify(&self, value: &str, now: DateTime<Utc>) -> Option<AdminClaim> {
        let (expires, signature) = value.split_once('.')?;
        let expires: i64 = expires.parse().ok()?;
        let signature = hex::decode(signature).ok()?;

        self.signature(expires)?.verify_slice(&signature).ok()?;

        let expires_at = Utc.timestamp_opt(expires, 0).single()?;
        (expires_at > now).then_some(AdminClaim { expires_at })
    }

    pub fn decode(&self, jar: &CookieJar, now: DateTime<Utc>) -> SessionState {
        let Some(cookie) = jar.get(SESSION_COOKIE) else {
            return SessionState::Missing;
        };
        match self.verify(cookie.value(), now) {
            Some(claim) => SessionState::Admin(claim),
            None => SessionState::Invalid,
        }
    }

    /// Cookie that makes the browser drop the session.
    pub fn clear() -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE, ""))
            .http_only(true)
            .secure(true)
            .same_site(SameSite::Strict)
            .path("/")
            .expires(time::OffsetDateTime::UNIX_EPOCH)
            .build()
    }
}

/// Compares fixed-length MACs of both values with `verify_slice`, so neither
/// the content nor the length of the secret leaks through timing.
pub fn password_matches(expected: &SecretString, submitted: &str) -> bool {
    let tag = |value: &str| {
        let mut mac = HmacSha256::new_from_slice(b"admin-password").ok()?;
        mac.update(value.as_bytes());
        Some(mac)
    };

    match (tag(expected.expose_secret()), tag(submitted)) {
        (Some(expected), Some(submitted)) => submitted
            .verify_slice(&expected.finalize().into_bytes())
            .is_ok(),
        _ => false,
    }
}

/// Extractor for JSON endpoints that require the admin claim.
pub struct AdminSession(pub AdminClaim);

impl FromRequestParts<AppState> for AdminSession {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        match state.sessions.decode(&jar, Utc::now()) {
            SessionState::Admin(claim) => Ok(AdminSession(claim)),
            SessionState::Missing => Err(AppError::Unauthorized("Unauthorized - No session")),
            SessionState::Invalid => {
                tracing::warn!("rejected invalid or expired session cookie");
                Err(AppError::Unauthorized("Unauthorized - Invalid session"))
            }
        }
    }
}

/// Extractor for HTML pages; sends the browser to the login page instead of
/// returning JSON.
pub struct AdminPage;

impl FromRequestParts<AppState> for AdminPage {
    type Rejection = LoginRedirect;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        match state.sessions.decode(&jar, Utc::now()) {
            SessionState::Admin(_) => Ok(AdminPage),
            _ => Err(LoginRedirect),
        }
    }
}

pub struct LoginRedirect;

impl IntoResponse for LoginRedirect {
    fn into_response(self) -> Response {
        Redirect::to(crate::LOGIN_PAGE).into_response()
    }
}
