//! Edge routing — cookie presence check for page routes
//!
//! Every page-bound GET is checked for the *presence* of a session cookie
//! before rendering: absent cookie redirects to the login page; a present
//! cookie on the login page redirects to the landing page. This is a
//! boolean presence test, not a decode: a forged or stale cookie passes
//! routing here and is rejected at the auth boundary on the first real
//! handler execution. Two-tier check, traded for routing latency.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Method, Request, header},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use cookie::Cookie;

use super::router::AppState;

/// Path prefixes the edge check never applies to
const EXEMPT_PREFIXES: [&str; 3] = ["/auth", "/api", "/health"];

/// Edge redirect middleware for page routes
pub async fn edge_redirect(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let path = request.uri().path();

    if request.method() != Method::GET
        || EXEMPT_PREFIXES.iter().any(|p| path.starts_with(p))
    {
        return next.run(request).await;
    }

    let cookie_name = &state.config.session.cookie_name;
    let has_session_cookie = request
        .headers()
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|raw| {
            Cookie::split_parse(raw.to_string())
                .flatten()
                .any(|c| c.name() == cookie_name)
        });

    let pages = &state.config.pages;
    if !has_session_cookie && path != pages.login_path {
        return Redirect::to(&pages.login_path).into_response();
    }
    if has_session_cookie && path == pages.login_path {
        return Redirect::to(&pages.home_path).into_response();
    }

    next.run(request).await
}
