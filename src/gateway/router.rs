//! HTTP router and shared application state

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Extension, Path},
    http::{HeaderMap, Method, StatusCode, header},
    middleware,
    response::{IntoResponse, Response},
    routing::{any, get, post},
};
use serde_json::json;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};
use tracing::error;

use super::auth::require_session;
use super::edge::edge_redirect;
use super::flows;
use super::upstream::BackendClient;
use crate::Result;
use crate::config::Config;
use crate::oauth::{TokenExchanger, build_http_client};
use crate::session::SessionCodec;

/// Shared application state
pub struct AppState {
    /// Immutable process-wide configuration
    pub config: Arc<Config>,
    /// Session codec (signing secret loaded once at startup)
    pub codec: SessionCodec,
    /// Token exchange client
    pub exchanger: TokenExchanger,
    /// Shared outbound HTTP client
    pub http: reqwest::Client,
}

impl AppState {
    /// Build the state from validated configuration
    pub fn from_config(config: Config) -> Result<Self> {
        let http = build_http_client(&config.auth_server)?;
        let codec = SessionCodec::new(&config.session.secret, config.session.max_age_secs);
        let exchanger = TokenExchanger::new(http.clone(), &config.auth_server)?;

        Ok(Self {
            config: Arc::new(config),
            codec,
            exchanger,
            http,
        })
    }
}

/// Create the router
pub fn create_router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/api/{*path}", any(backend_proxy))
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            require_session,
        ));

    Router::new()
        .route("/health", get(health_handler))
        .route("/auth/login", post(flows::login))
        .route("/auth/logout", post(flows::logout))
        .route("/auth/refresh", post(flows::refresh))
        .route("/auth/session", get(flows::session_status))
        .route("/auth/sso", get(flows::sso_entry))
        .merge(protected)
        .fallback(page_fallback)
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            edge_redirect,
        ))
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health
async fn health_handler() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Page routes are rendered by the upstream frontend; anything that gets
/// past the edge redirect and matches no route is simply not found here.
async fn page_fallback() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Not found" })),
    )
}

/// Thin passthrough for protected backend calls.
///
/// The auth middleware has already validated the session and built the
/// [`BackendClient`]; this handler only forwards method, path, body, and
/// content type, and relays the backend's status and body.
async fn backend_proxy(
    Extension(client): Extension<BackendClient>,
    Path(path): Path<String>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let upstream_method = reqwest::Method::from_bytes(method.as_str().as_bytes())
        .unwrap_or(reqwest::Method::GET);

    let mut request = client.request(upstream_method, &format!("/{path}"));
    if let Some(content_type) = headers.get(header::CONTENT_TYPE) {
        request = request.header(header::CONTENT_TYPE, content_type.clone());
    }
    if !body.is_empty() {
        request = request.body(body.to_vec());
    }

    match request.send().await {
        Ok(upstream) => {
            let status = StatusCode::from_u16(upstream.status().as_u16())
                .unwrap_or(StatusCode::BAD_GATEWAY);
            let content_type = upstream.headers().get(header::CONTENT_TYPE).cloned();
            let bytes = upstream.bytes().await.unwrap_or_default();

            let mut response = (status, bytes.to_vec()).into_response();
            if let Some(content_type) = content_type {
                response.headers_mut().insert(header::CONTENT_TYPE, content_type);
            }
            response
        }
        Err(e) => {
            error!(error = %e, path = %path, "Backend request failed");
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "error": "Backend unavailable" })),
            )
                .into_response()
        }
    }
}
