//! Error types for the session gateway

use std::io;

use thiserror::Error;

/// Result type alias for the session gateway
pub type Result<T> = std::result::Result<T, Error>;

/// Session gateway errors
///
/// Variants map onto the failure classes callers need to tell apart:
/// configuration problems (fatal, answered 500 with a generic message),
/// authentication problems (401), and remote exchange failures (the
/// authorization server's status and body carried through).
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error (missing base URL, credentials, secret, ...)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Request is not authenticated (missing/expired/invalid session)
    #[error("Not authenticated: {0}")]
    Unauthorized(String),

    /// A session update was attempted with no session to update
    #[error("No active session")]
    NoActiveSession,

    /// The authorization server rejected a token exchange
    #[error("Token exchange failed: HTTP {status}")]
    Exchange {
        /// HTTP status returned by the authorization server
        status: u16,
        /// Response body from the authorization server
        body: String,
    },

    /// Session signing / verification error
    #[error("Session codec error: {0}")]
    Codec(#[from] jsonwebtoken::errors::Error),

    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
