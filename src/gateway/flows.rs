//! Flow controllers — login, logout, refresh, SSO entry, session status
//!
//! Session state moves `Anonymous → Authenticating → Authenticated →
//! Refreshing → Authenticated` and back to `Anonymous` on logout or an
//! unrecoverable failure. Each handler builds a per-request cookie store,
//! drives the session manager, and drains queued `Set-Cookie` values onto
//! its response.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use super::router::AppState;
use crate::oauth::{AccessTokenClaims, TokenResponse};
use crate::session::{
    CookieStore, HttpCookieStore, Session, SessionManager, SessionUpdate, UserIdentity,
};
use crate::{Error, Result};

/// Query parameters accepted by the SSO entry point
#[derive(Debug, Deserialize)]
pub struct SsoQuery {
    /// Post-login redirect target (default `/`)
    #[serde(default)]
    pub next: Option<String>,
}

fn manager<'a>(state: &'a AppState, cookies: &'a HttpCookieStore) -> SessionManager<'a> {
    SessionManager::new(
        &state.codec,
        cookies,
        &state.config.session,
        state.config.mode.is_production(),
    )
}

fn with_cookies(cookies: &HttpCookieStore, mut response: Response) -> Response {
    cookies.apply(response.headers_mut());
    response
}

/// Derive identity from the fresh access token and write a new session.
fn establish_session(
    state: &AppState,
    cookies: &HttpCookieStore,
    token: &TokenResponse,
) -> Result<Session> {
    let claims = AccessTokenClaims::peek(&token.access_token)?;
    let user = UserIdentity::from(&claims);

    let expires_in_ms = i64::try_from(token.expires_in.saturating_mul(1000)).unwrap_or(i64::MAX);
    let session = Session {
        user,
        access_token: token.access_token.clone(),
        expires_at: Utc::now().timestamp_millis() + expires_in_ms,
    };

    manager(state, cookies).create_session(&session)?;
    Ok(session)
}

/// POST /auth/login — development-mode client-credentials login.
///
/// Exchange failures surface the authorization server's status and body
/// verbatim for the UI; the session stays anonymous.
pub async fn login(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    if state.config.mode.is_production() {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Interactive login is disabled outside development" })),
        )
            .into_response();
    }

    let cookies = HttpCookieStore::from_headers(&headers);

    let token = match state.exchanger.exchange_client_credentials().await {
        Ok(token) => token,
        Err(e) => return e.into_response(),
    };

    match establish_session(&state, &cookies, &token) {
        Ok(session) => {
            info!(user = %session.user.username, "Login succeeded");
            with_cookies(
                &cookies,
                Json(json!({ "success": true, "user": session.user })).into_response(),
            )
        }
        Err(e) => e.into_response(),
    }
}

/// GET /auth/sso?next=… — production SSO entry.
///
/// No assertion cookie: redirect to the external SSO login. Exchange
/// failure: also redirect to SSO login (a fresh assertion is the only
/// recovery path), never an error page.
pub async fn sso_entry(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SsoQuery>,
    headers: HeaderMap,
) -> Response {
    let cookies = HttpCookieStore::from_headers(&headers);
    let sso = &state.config.sso;

    let Some(assertion) = cookies.get(&sso.cookie_name) else {
        return Redirect::to(&sso.login_url).into_response();
    };

    match state.exchanger.exchange_jwt_bearer(&assertion).await {
        Ok(token) => match establish_session(&state, &cookies, &token) {
            Ok(session) => {
                info!(user = %session.user.username, "SSO login succeeded");
                let next = sanitize_next(query.next.as_deref());
                with_cookies(&cookies, Redirect::to(&next).into_response())
            }
            Err(e) => {
                // No error page on the SSO path; a fresh round-trip is
                // the only recovery
                warn!(error = %e, "Could not establish session after SSO exchange");
                Redirect::to(&sso.login_url).into_response()
            }
        },
        Err(Error::Exchange { status, .. }) => {
            warn!(status, "SSO assertion exchange failed, redirecting to SSO login");
            Redirect::to(&sso.login_url).into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// Only same-site relative paths are accepted as redirect targets.
fn sanitize_next(next: Option<&str>) -> String {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") => path.to_string(),
        _ => "/".to_string(),
    }
}

/// POST /auth/refresh — replace the access token before expiry.
///
/// Development re-runs the client-credentials exchange; production
/// requires the SSO assertion cookie and runs the bearer exchange. The
/// user identity is preserved; only token and expiry change.
pub async fn refresh(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let cookies = HttpCookieStore::from_headers(&headers);

    let exchange = if state.config.mode.is_development() {
        state.exchanger.exchange_client_credentials().await
    } else {
        let Some(assertion) = cookies.get(&state.config.sso.cookie_name) else {
            // Fatal for this session; a new SSO round-trip is required
            return Error::Unauthorized("SSO cookie missing".to_string()).into_response();
        };
        state.exchanger.exchange_jwt_bearer(&assertion).await
    };

    let token = match exchange {
        Ok(token) => token,
        Err(e @ Error::Exchange { .. }) if state.config.mode.is_production() => {
            warn!(error = %e, "Refresh exchange rejected");
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "Refresh failed" })),
            )
                .into_response();
        }
        Err(e) => return e.into_response(),
    };

    let expires_in_ms = i64::try_from(token.expires_in.saturating_mul(1000)).unwrap_or(i64::MAX);
    let update = SessionUpdate {
        access_token: Some(token.access_token),
        expires_at: Some(Utc::now().timestamp_millis() + expires_in_ms),
        user: None,
    };

    match manager(&state, &cookies).update_session(update) {
        Ok(session) => {
            info!(user = %session.user.username, "Session refreshed");
            with_cookies(
                &cookies,
                Json(json!({ "success": true, "expires_at": session.expires_at }))
                    .into_response(),
            )
        }
        Err(e) => e.into_response(),
    }
}

/// POST /auth/logout — destroy the session.
///
/// Production also clears the external SSO cookie. Always returns a
/// redirect target: the login page in development, the external SSO
/// logout URL in production.
pub async fn logout(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let cookies = HttpCookieStore::from_headers(&headers);
    manager(&state, &cookies).delete_session();

    let redirect = if state.config.mode.is_production() {
        cookies.remove(&state.config.sso.cookie_name);
        state.config.sso.logout_url.clone()
    } else {
        state.config.pages.login_path.clone()
    };

    info!("Logged out");
    with_cookies(&cookies, Json(json!({ "redirect": redirect })).into_response())
}

/// GET /auth/session — read-only authentication status.
///
/// Reports the user identity, never the access token. Never mutates
/// state.
pub async fn session_status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Response {
    let cookies = HttpCookieStore::from_headers(&headers);

    match manager(&state, &cookies).get_session() {
        Some(session) if !session.is_expired() => Json(json!({
            "authenticated": true,
            "user": session.user,
            "expires_at": session.expires_at,
        }))
        .into_response(),
        _ => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "authenticated": false })),
        )
            .into_response(),
    }
}
