//! Authorization for the applicant's own application listing.
//!
//! Three checks run in order and stop at the first failure:
//! 1. the `token` cookie holds a valid session token (401 otherwise)
//! 2. the `Authorization: Bearer` header holds a verified identity token
//!    carrying an email (401 otherwise)
//! 3. the `email` query parameter equals both emails (403 otherwise)

use axum::extract::{FromRequestParts, Query};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::{HeaderMap, Uri};
use axum_extra::extract::CookieJar;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::auth::identity::IdentityVerifier;
use crate::auth::session::{SessionKeys, SESSION_COOKIE};
use crate::error::ApiError;
use crate::state::AppState;

/// Check that rejected a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStage {
    Session,
    Identity,
    Emails,
}

impl AuthStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthStage::Session => "session",
            AuthStage::Identity => "identity",
            AuthStage::Emails => "emails",
        }
    }
}

/// Applicant whose session, identity and requested email all agree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizedApplicant {
    pub email: String,
}

#[derive(Debug, Deserialize)]
struct EmailQuery {
    email: Option<String>,
}

/// Run the checks against a request's headers and URI.
pub async fn authorize(
    headers: &HeaderMap,
    uri: &Uri,
    sessions: &SessionKeys,
    verifier: &dyn IdentityVerifier,
) -> Result<AuthorizedApplicant, ApiError> {
    let session_email =
        session_email(headers, sessions).map_err(|e| reject(AuthStage::Session, e))?;

    let identity_email = identity_email(headers, verifier)
        .await
        .map_err(|e| reject(AuthStage::Identity, e))?;

    let email = requested_email(uri, &session_email, &identity_email)
        .map_err(|e| reject(AuthStage::Emails, e))?;

    debug!(email = %email, "Applicant authorized");
    Ok(AuthorizedApplicant { email })
}

fn reject(stage: AuthStage, err: ApiError) -> ApiError {
    warn!(stage = stage.as_str(), "Authentication rejected: {}", err);
    err
}

fn session_email(headers: &HeaderMap, sessions: &SessionKeys) -> Result<String, ApiError> {
    let jar = CookieJar::from_headers(headers);
    let token = jar
        .get(SESSION_COOKIE)
        .map(|c| c.value())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::unauthorized("Missing session cookie"))?;

    Ok(sessions.verify(token)?.email)
}

fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let auth_header = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| ApiError::unauthorized("Missing Authorization header"))?
        .to_str()
        .map_err(|_| ApiError::unauthorized("Invalid Authorization header"))?;

    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::unauthorized("Invalid Authorization header format"))
}

async fn identity_email(
    headers: &HeaderMap,
    verifier: &dyn IdentityVerifier,
) -> Result<String, ApiError> {
    let token = bearer_token(headers)?;
    verifier
        .verify(token)
        .await?
        .email
        .ok_or_else(|| ApiError::unauthorized("Identity token has no email"))
}

fn requested_email(
    uri: &Uri,
    session_email: &str,
    identity_email: &str,
) -> Result<String, ApiError> {
    let email = Query::<EmailQuery>::try_from_uri(uri)
        .ok()
        .and_then(|Query(q)| q.email)
        .filter(|e| !e.is_empty())
        .ok_or_else(|| ApiError::forbidden("Missing email"))?;

    if email != session_email || email != identity_email {
        return Err(ApiError::forbidden("Email does not match credentials"));
    }
    Ok(email)
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthorizedApplicant {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        authorize(
            &parts.headers,
            &parts.uri,
            &state.sessions,
            state.identity.as_ref(),
        )
        .await
    }
}
