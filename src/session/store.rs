//! Cookie store abstraction
//!
//! The session manager talks to cookies through the narrow [`CookieStore`]
//! trait so it can be tested without an HTTP request/response context.
//! [`HttpCookieStore`] backs it with the real request headers and buffers
//! outgoing `Set-Cookie` values until the handler drains them onto the
//! response; [`MemoryCookieStore`] backs it with a plain map for tests.

use std::collections::HashMap;

use axum::http::{HeaderMap, HeaderValue, header};
use cookie::Cookie;
use parking_lot::Mutex;
use tracing::warn;

/// Narrow cookie I/O interface: get, set, delete by name.
pub trait CookieStore: Send + Sync {
    /// Read a cookie value from the incoming request
    fn get(&self, name: &str) -> Option<String>;

    /// Queue a cookie to be set on the response
    fn set(&self, cookie: Cookie<'static>);

    /// Queue removal of a cookie (expired `Set-Cookie` on the response)
    fn remove(&self, name: &str);
}

/// Cookie store backed by an HTTP request's `Cookie` header.
///
/// Outgoing cookies are buffered; call [`HttpCookieStore::apply`] to write
/// them onto the response headers.
pub struct HttpCookieStore {
    incoming: HashMap<String, String>,
    outgoing: Mutex<Vec<Cookie<'static>>>,
}

impl HttpCookieStore {
    /// Parse the request's `Cookie` header
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut incoming = HashMap::new();

        if let Some(raw) = headers.get(header::COOKIE).and_then(|v| v.to_str().ok()) {
            for cookie in Cookie::split_parse_encoded(raw.to_string()).flatten() {
                incoming.insert(cookie.name().to_string(), cookie.value().to_string());
            }
        }

        Self {
            incoming,
            outgoing: Mutex::new(Vec::new()),
        }
    }

    /// Write the buffered `Set-Cookie` values onto response headers
    pub fn apply(&self, headers: &mut HeaderMap) {
        for cookie in self.outgoing.lock().iter() {
            match HeaderValue::from_str(&cookie.encoded().to_string()) {
                Ok(value) => {
                    headers.append(header::SET_COOKIE, value);
                }
                Err(e) => {
                    warn!(cookie = %cookie.name(), error = %e, "Dropped unencodable cookie");
                }
            }
        }
    }

    /// Replace any pending cookie with the same name
    fn queue(&self, cookie: Cookie<'static>) {
        let mut outgoing = self.outgoing.lock();
        outgoing.retain(|c| c.name() != cookie.name());
        outgoing.push(cookie);
    }
}

impl CookieStore for HttpCookieStore {
    fn get(&self, name: &str) -> Option<String> {
        self.incoming.get(name).cloned()
    }

    fn set(&self, cookie: Cookie<'static>) {
        self.queue(cookie);
    }

    fn remove(&self, name: &str) {
        let removal = Cookie::build((name.to_string(), ""))
            .path("/")
            .http_only(true)
            .max_age(time::Duration::ZERO)
            .build();
        self.queue(removal);
    }
}

/// In-memory cookie store used in tests
#[derive(Default)]
pub struct MemoryCookieStore {
    cookies: Mutex<HashMap<String, String>>,
}

impl MemoryCookieStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a cookie as if the client had sent it
    pub fn insert(&self, name: &str, value: &str) {
        self.cookies
            .lock()
            .insert(name.to_string(), value.to_string());
    }
}

impl CookieStore for MemoryCookieStore {
    fn get(&self, name: &str) -> Option<String> {
        self.cookies.lock().get(name).cloned()
    }

    fn set(&self, cookie: Cookie<'static>) {
        self.cookies
            .lock()
            .insert(cookie.name().to_string(), cookie.value().to_string());
    }

    fn remove(&self, name: &str) {
        self.cookies.lock().remove(name);
    }
}
