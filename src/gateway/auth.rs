//! Auth boundary — session validation middleware and error mapping
//!
//! [`require_session`] wraps every protected route: it validates session
//! presence and expiry, then injects the [`Session`] and a
//! pre-authenticated [`BackendClient`] into request extensions. Protected
//! handlers never perform their own auth-error mapping; the
//! [`IntoResponse`] impl on [`Error`] is the single place lower-layer
//! failures become HTTP responses.

use std::sync::Arc;

use axum::{
    Json,
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::{debug, error, warn};

use super::router::AppState;
use super::upstream::BackendClient;
use crate::Error;
use crate::session::{HttpCookieStore, SessionManager};

/// Cap on how much upstream error body is echoed to the browser
const MAX_ECHOED_BODY: usize = 512;

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::Unauthorized(message) => {
                (StatusCode::UNAUTHORIZED, Json(json!({ "error": message }))).into_response()
            }
            Error::NoActiveSession => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "No active session" })),
            )
                .into_response(),
            Error::Config(message) => {
                // Details stay server-side; secrets are never echoed
                error!(%message, "Configuration error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Server configuration error" })),
                )
                    .into_response()
            }
            Error::Exchange { status, body } => {
                let status =
                    StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
                let mut detail = body;
                if detail.len() > MAX_ECHOED_BODY {
                    let mut cut = MAX_ECHOED_BODY;
                    while !detail.is_char_boundary(cut) {
                        cut -= 1;
                    }
                    detail.truncate(cut);
                }
                (
                    status,
                    Json(json!({ "error": "Token exchange failed", "detail": detail })),
                )
                    .into_response()
            }
            other => {
                error!(error = %other, "Unhandled error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Internal server error" })),
                )
                    .into_response()
            }
        }
    }
}

/// Middleware guarding protected routes.
///
/// Absent or expired sessions are rejected with 401 before the wrapped
/// handler runs. Valid sessions get a [`BackendClient`] injected; the
/// handler composes backend calls without touching the access token.
pub async fn require_session(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let cookies = HttpCookieStore::from_headers(request.headers());
    let manager = SessionManager::new(
        &state.codec,
        &cookies,
        &state.config.session,
        state.config.mode.is_production(),
    );

    let Some(session) = manager.get_session() else {
        debug!(path = %request.uri().path(), "No valid session");
        return Error::Unauthorized("Not authenticated".to_string()).into_response();
    };

    if session.is_expired() {
        warn!(user = %session.user.username, "Session access token expired");
        return Error::Unauthorized("Session expired".to_string()).into_response();
    }

    let client = BackendClient::new(state.http.clone(), &state.config.backend, &session);
    request.extensions_mut().insert(session);
    request.extensions_mut().insert(client);

    next.run(request).await
}
