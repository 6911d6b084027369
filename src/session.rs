//! Anonymous session binding through a signed cookie
//!
//! The cookie carries `<session id>.<signature>`, where the signature is an
//! HMAC-SHA256 over the id. A missing or tampered cookie yields a fresh id.

use anyhow::{anyhow, Result};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::prelude::*;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::sync::Arc;
use subtle::ConstantTimeEq;

use crate::config::SessionConfig;

/// Opaque identifier of the session that issued a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

pub struct SessionKeys {
    cookie_name: String,
    key: Vec<u8>,
}

impl SessionKeys {
    /// If no secret is configured, generates a random key (sessions won't survive restarts)
    pub fn new(cookie_name: impl Into<String>, secret: Option<&str>) -> Self {
        let key = match secret {
            Some(s) => s.as_bytes().to_vec(),
            None => {
                use rand::RngExt;
                let mut rng = rand::rng();
                (0..32).map(|_| rng.random::<u8>()).collect()
            }
        };

        Self {
            cookie_name: cookie_name.into(),
            key,
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        if config.secret.is_none() {
            tracing::warn!("SESSION_SECRET not set, using a random key; sessions reset on restart");
        }
        Self::new(config.cookie_name.clone(), config.secret.as_deref())
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    fn mac(&self) -> Result<Hmac<Sha256>> {
        Hmac::<Sha256>::new_from_slice(&self.key).map_err(|e| anyhow!("Failed to create HMAC: {}", e))
    }

    /// Produce the cookie value for a session id
    pub fn sign(&self, session_id: &str) -> Result<String> {
        let mut mac = self.mac()?;
        mac.update(session_id.as_bytes());
        let signature = BASE64_URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        Ok(format!("{}.{}", session_id, signature))
    }

    /// Recover the session id from a cookie value, rejecting bad signatures
    pub fn verify(&self, value: &str) -> Result<String> {
        let (session_id, signature_b64) = value
            .rsplit_once('.')
            .ok_or_else(|| anyhow!("Invalid session cookie format"))?;

        if session_id.is_empty() {
            return Err(anyhow!("Empty session id"));
        }

        let provided = BASE64_URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| anyhow!("Invalid session signature encoding"))?;

        let mut mac = self.mac()?;
        mac.update(session_id.as_bytes());
        let expected = mac.finalize().into_bytes();

        if expected.ct_eq(&provided[..]).into() {
            Ok(session_id.to_string())
        } else {
            Err(anyhow!("Session signature verification failed"))
        }
    }
}

fn new_session_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Attach a [`SessionId`] to every request, issuing a cookie on first contact
pub async fn session_middleware(
    State(keys): State<Arc<SessionKeys>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let existing = jar
        .get(keys.cookie_name())
        .and_then(|cookie| keys.verify(cookie.value()).ok());

    let (session_id, is_new) = match existing {
        Some(id) => (id, false),
        None => (new_session_id(), true),
    };

    request.extensions_mut().insert(SessionId(session_id.clone()));
    let response = next.run(request).await;

    if !is_new {
        return response;
    }

    match keys.sign(&session_id) {
        Ok(value) => {
            let cookie = Cookie::build((keys.cookie_name().to_string(), value))
                .path("/")
                .http_only(true)
                .same_site(SameSite::Lax)
                .permanent();
            (jar.add(cookie), response).into_response()
        }
        Err(e) => {
            tracing::error!("Failed to sign session cookie: {}", e);
            response
        }
    }
}
