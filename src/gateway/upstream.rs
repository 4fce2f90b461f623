//! Pre-authenticated upstream client
//!
//! Built by the auth middleware for each authenticated request and handed
//! to protected handlers. Token injection happens only here: handlers
//! compose requests against the backend without ever seeing the raw
//! access token.

use std::fmt;

use reqwest::{Client, Method, RequestBuilder};

use crate::config::BackendConfig;
use crate::session::Session;

/// Header identifying the calling service
pub const ORIGIN_SERVICE_HEADER: &str = "X-Origin-Service";
/// Header identifying the calling application
pub const ORIGIN_APPLICATION_HEADER: &str = "X-Origin-Application";
/// Header carrying the session user's display name
pub const ORIGIN_USER_HEADER: &str = "X-Origin-User";

/// Upstream HTTP client bound to one session's access token
#[derive(Clone)]
pub struct BackendClient {
    http: Client,
    base_url: String,
    access_token: String,
    origin_service: String,
    origin_application: String,
    origin_user: String,
}

impl BackendClient {
    /// Bind the shared HTTP client to a session and backend configuration
    #[must_use]
    pub fn new(http: Client, config: &BackendConfig, session: &Session) -> Self {
        Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            access_token: session.access_token.clone(),
            origin_service: config.origin_service.clone(),
            origin_application: config.origin_application.clone(),
            origin_user: session.user.display_name.clone(),
        }
    }

    /// Start a request against the backend. `path` must begin with `/`.
    ///
    /// Every request carries the bearer token and the fixed identity
    /// headers.
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{path}", self.base_url))
            .bearer_auth(&self.access_token)
            .header(ORIGIN_SERVICE_HEADER, &self.origin_service)
            .header(ORIGIN_APPLICATION_HEADER, &self.origin_application)
            .header(ORIGIN_USER_HEADER, &self.origin_user)
    }

    /// GET a backend path
    pub fn get(&self, path: &str) -> RequestBuilder {
        self.request(Method::GET, path)
    }

    /// POST to a backend path
    pub fn post(&self, path: &str) -> RequestBuilder {
        self.request(Method::POST, path)
    }
}

// Keeps the access token out of debug logs
impl fmt::Debug for BackendClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendClient")
            .field("base_url", &self.base_url)
            .field("origin_user", &self.origin_user)
            .finish_non_exhaustive()
    }
}
