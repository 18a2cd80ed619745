//! Session cookie handlers.

use axum::extract::State;
use axum::http::header::SET_COOKIE;
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use crate::auth::session::{clear_session_cookie, session_cookie};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Body of `POST /jwt`. Other fields are ignored.
#[derive(Debug, Deserialize, Validate)]
pub struct SessionRequest {
    #[validate(email)]
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub success: bool,
}

/// Issue a session token for the posted email as an HttpOnly cookie.
pub async fn issue_session(
    State(state): State<AppState>,
    Json(request): Json<SessionRequest>,
) -> ApiResult<(HeaderMap, Json<SessionResponse>)> {
    request
        .validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let token = state.sessions.issue(&request.email)?;

    let mut headers = HeaderMap::new();
    headers.insert(
        SET_COOKIE,
        session_cookie(&token, state.config.is_production())?,
    );
    info!(email = %request.email, "Issued session");

    Ok((headers, Json(SessionResponse { success: true })))
}

/// Clear the session cookie.
pub async fn end_session(State(state): State<AppState>) -> (HeaderMap, Json<SessionResponse>) {
    let mut headers = HeaderMap::new();
    headers.insert(
        SET_COOKIE,
        clear_session_cookie(state.config.is_production()),
    );
    (headers, Json(SessionResponse { success: true }))
}
