//! Session tokens.
//!
//! A session token is an HS256 JWT with `{email, iat, exp}` claims, valid for
//! one day and delivered as an HttpOnly cookie.

use axum::http::HeaderValue;
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Cookie carrying the session token.
pub const SESSION_COOKIE: &str = "token";

/// Session lifetime in seconds.
pub const SESSION_TTL_SECS: i64 = 24 * 60 * 60;

/// Claims stored in a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

/// Signing and verification keys derived from the server secret.
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl SessionKeys {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }

    /// Sign a one-day session token for `email`.
    pub fn issue(&self, email: &str) -> Result<String, ApiError> {
        let iat = Utc::now().timestamp();
        let claims = SessionClaims {
            email: email.to_string(),
            iat,
            exp: iat + SESSION_TTL_SECS,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| ApiError::internal(format!("Failed to sign session token: {}", e)))
    }

    /// Check signature and expiry, returning the claims.
    pub fn verify(&self, token: &str) -> Result<SessionClaims, ApiError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp"]);
        validation.leeway = 0;

        decode::<SessionClaims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| ApiError::unauthorized(format!("Invalid session token: {}", e)))
    }
}

fn cookie_attributes(production: bool) -> &'static str {
    if production {
        "Secure; SameSite=None"
    } else {
        "SameSite=Strict"
    }
}

/// `Set-Cookie` value that stores the session token.
pub fn session_cookie(token: &str, production: bool) -> Result<HeaderValue, ApiError> {
    HeaderValue::from_str(&format!(
        "{}={}; HttpOnly; Path=/; Max-Age={}; {}",
        SESSION_COOKIE,
        token,
        SESSION_TTL_SECS,
        cookie_attributes(production)
    ))
    .map_err(|e| ApiError::internal(format!("Invalid cookie value: {}", e)))
}

/// `Set-Cookie` value that clears the session cookie.
pub fn clear_session_cookie(production: bool) -> HeaderValue {
    let value = if production {
        "token=; HttpOnly; Path=/; Max-Age=0; Secure; SameSite=None"
    } else {
        "token=; HttpOnly; Path=/; Max-Age=0; SameSite=Strict"
    };
    HeaderValue::from_static(value)
}
