//! Session Gateway Library
//!
//! Stateless session and OAuth2 token-exchange gateway for browser-facing
//! backend APIs.
//!
//! # Design
//!
//! - **Stateless sessions**: the entire session (user identity, access
//!   token, expiry) lives in a signed HTTP-only cookie; the server holds no
//!   copy between requests, so replicas scale horizontally without sticky
//!   sessions.
//! - **Two grant flows**: OAuth2 client-credentials for development,
//!   JWT-bearer SSO-assertion exchange for production.
//! - **Single auth boundary**: one middleware validates the session and
//!   injects a pre-authenticated upstream client; protected handlers never
//!   see the raw access token.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod config;
pub mod error;
pub mod gateway;
pub mod oauth;
pub mod session;

pub use error::{Error, Result};

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Setup tracing/logging
pub fn setup_tracing(level: &str, format: Option<&str>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry().with(filter);

    match format {
        Some("json") => {
            subscriber.with(fmt::layer().json()).init();
        }
        _ => {
            subscriber.with(fmt::layer()).init();
        }
    }

    Ok(())
}
