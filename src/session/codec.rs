//! Session codec — signs and verifies the session payload
//!
//! Sessions are encoded as compact HS256 JWTs signed with a server-held
//! symmetric secret. The codec carries its own `iat`/`exp` claims bound by
//! the configured maximum age, independent of the session's own
//! `expires_at`, so a stale cookie is rejected even if its payload claims
//! otherwise. Decoding is a pure function with no I/O; any verification
//! failure (expired, tampered, malformed) yields `None`, never a panic.
//!
//! The secret is process-wide configuration loaded once at startup.
//! Rotating it invalidates all outstanding sessions.

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::Result;

/// Identity of the authenticated user, derived once from the decoded
/// access token at login/SSO time and immutable for the session's lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    /// Login / subject identifier
    pub username: String,
    /// Human-readable display name
    pub display_name: String,
    /// Email address (may be empty if the token carries none)
    pub email: String,
    /// Short initials for avatar display
    pub initials: String,
}

/// Authentication state carried in the signed cookie.
///
/// The cookie value on the client is the only copy; the server holds no
/// session state between requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Authenticated user
    pub user: UserIdentity,
    /// Access token attached to backend API calls
    pub access_token: String,
    /// Access token expiry, epoch milliseconds
    pub expires_at: i64,
}

impl Session {
    /// Whether the access token has expired
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now().timestamp_millis()
    }
}

/// Claims embedded in the signed session token
#[derive(Debug, Serialize, Deserialize)]
struct SessionClaims {
    user: UserIdentity,
    token: String,
    expires_at: i64,
    iat: i64,
    exp: i64,
}

/// Signs and verifies session tokens
pub struct SessionCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    max_age_secs: u64,
}

impl SessionCodec {
    /// Create a codec from the signing secret and session lifetime
    #[must_use]
    pub fn new(secret: &str, max_age_secs: u64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 60;

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            max_age_secs,
        }
    }

    /// Sign a session into an opaque token string
    pub fn encode(&self, session: &Session) -> Result<String> {
        let now = Utc::now().timestamp();
        self.encode_at(session, now)
    }

    fn encode_at(&self, session: &Session, iat: i64) -> Result<String> {
        let claims = SessionClaims {
            user: session.user.clone(),
            token: session.access_token.clone(),
            expires_at: session.expires_at,
            iat,
            exp: iat + i64::try_from(self.max_age_secs).unwrap_or(i64::MAX),
        };

        Ok(jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &self.encoding,
        )?)
    }

    /// Verify a token and recover the session.
    ///
    /// Returns `None` on any verification failure: bad signature, expired
    /// signature, corrupted or malformed payload.
    #[must_use]
    pub fn decode(&self, token: &str) -> Option<Session> {
        match jsonwebtoken::decode::<SessionClaims>(token, &self.decoding, &self.validation) {
            Ok(data) => Some(Session {
                user: data.claims.user,
                access_token: data.claims.token,
                expires_at: data.claims.expires_at,
            }),
            Err(e) => {
                debug!(error = %e, "Rejected session token");
                None
            }
        }
    }
}
