//! Session manager — orchestrates codec and cookie store
//!
//! All four operations are idempotent with respect to repeated identical
//! calls, and none of them errors for "no session": readers get `None` and
//! decide the response themselves.

use cookie::{Cookie, SameSite};
use tracing::debug;

use super::codec::{Session, SessionCodec, UserIdentity};
use super::store::CookieStore;
use crate::config::SessionConfig;
use crate::{Error, Result};

/// Partial session delta applied by [`SessionManager::update_session`].
///
/// `None` fields keep their current value; the merged result is always
/// re-signed as a complete payload.
#[derive(Debug, Default)]
pub struct SessionUpdate {
    /// Replacement access token
    pub access_token: Option<String>,
    /// Replacement expiry, epoch milliseconds
    pub expires_at: Option<i64>,
    /// Replacement user identity (normally preserved across refresh)
    pub user: Option<UserIdentity>,
}

/// Create, read, update, delete session state via the cookie store
pub struct SessionManager<'a> {
    codec: &'a SessionCodec,
    cookies: &'a dyn CookieStore,
    settings: &'a SessionConfig,
    secure: bool,
}

impl<'a> SessionManager<'a> {
    /// Create a manager for a single request.
    ///
    /// `secure` marks the session cookie `Secure` (everything outside
    /// development mode).
    #[must_use]
    pub fn new(
        codec: &'a SessionCodec,
        cookies: &'a dyn CookieStore,
        settings: &'a SessionConfig,
        secure: bool,
    ) -> Self {
        Self {
            codec,
            cookies,
            settings,
            secure,
        }
    }

    /// Read the current session.
    ///
    /// An absent cookie is "no session", not an error. A present but
    /// invalid cookie also yields `None` (fail closed).
    #[must_use]
    pub fn get_session(&self) -> Option<Session> {
        let token = self.cookies.get(&self.settings.cookie_name)?;
        let session = self.codec.decode(&token);
        if session.is_none() {
            debug!("Session cookie present but failed verification");
        }
        session
    }

    /// Encode the session and write the cookie
    pub fn create_session(&self, session: &Session) -> Result<()> {
        let token = self.codec.encode(session)?;

        let max_age = time::Duration::seconds(
            i64::try_from(self.settings.max_age_secs).unwrap_or(i64::MAX),
        );
        let cookie = Cookie::build((self.settings.cookie_name.clone(), token))
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure)
            .path("/")
            .max_age(max_age)
            .build();

        self.cookies.set(cookie);
        Ok(())
    }

    /// Merge a delta over the current session and re-create the cookie.
    ///
    /// Fails with [`Error::NoActiveSession`] if there is nothing to
    /// update; refresh can never create a session from nothing.
    pub fn update_session(&self, update: SessionUpdate) -> Result<Session> {
        let current = self.get_session().ok_or(Error::NoActiveSession)?;

        let merged = Session {
            user: update.user.unwrap_or(current.user),
            access_token: update.access_token.unwrap_or(current.access_token),
            expires_at: update.expires_at.unwrap_or(current.expires_at),
        };

        self.create_session(&merged)?;
        Ok(merged)
    }

    /// Remove the session cookie
    pub fn delete_session(&self) {
        self.cookies.remove(&self.settings.cookie_name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::store::MemoryCookieStore;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn settings() -> SessionConfig {
        SessionConfig {
            secret: "test-secret-test-secret-test-secret".to_string(),
            cookie_name: "app_session".to_string(),
            max_age_secs: 3600,
        }
    }

    fn codec() -> SessionCodec {
        SessionCodec::new("test-secret-test-secret-test-secret", 3600)
    }

    fn sample_session() -> Session {
        Session {
            user: UserIdentity {
                username: "jdoe".to_string(),
                display_name: "Jane Doe".to_string(),
                email: "jdoe@example.com".to_string(),
                initials: "JD".to_string(),
            },
            access_token: "token-1".to_string(),
            expires_at: Utc::now().timestamp_millis() + 3_600_000,
        }
    }

    #[test]
    fn create_then_get_round_trips() {
        let codec = codec();
        let store = MemoryCookieStore::new();
        let settings = settings();
        let manager = SessionManager::new(&codec, &store, &settings, false);

        let session = sample_session();
        manager.create_session(&session).unwrap();

        assert_eq!(manager.get_session(), Some(session));
    }

    #[test]
    fn absent_cookie_is_no_session() {
        let codec = codec();
        let store = MemoryCookieStore::new();
        let settings = settings();
        let manager = SessionManager::new(&codec, &store, &settings, false);

        assert!(manager.get_session().is_none());
    }

    #[test]
    fn invalid_cookie_fails_closed() {
        let codec = codec();
        let store = MemoryCookieStore::new();
        store.insert("app_session", "forged-token");
        let settings = settings();
        let manager = SessionManager::new(&codec, &store, &settings, false);

        assert!(manager.get_session().is_none());
    }

    #[test]
    fn update_merges_delta_and_preserves_user() {
        let codec = codec();
        let store = MemoryCookieStore::new();
        let settings = settings();
        let manager = SessionManager::new(&codec, &store, &settings, false);

        let session = sample_session();
        manager.create_session(&session).unwrap();

        let new_expiry = session.expires_at + 1_000_000;
        let updated = manager
            .update_session(SessionUpdate {
                access_token: Some("token-2".to_string()),
                expires_at: Some(new_expiry),
                user: None,
            })
            .unwrap();

        assert_eq!(updated.user, session.user);
        assert_eq!(updated.access_token, "token-2");
        assert_eq!(updated.expires_at, new_expiry);
        assert_eq!(manager.get_session(), Some(updated));
    }

    #[test]
    fn update_without_session_fails() {
        let codec = codec();
        let store = MemoryCookieStore::new();
        let settings = settings();
        let manager = SessionManager::new(&codec, &store, &settings, false);

        let err = manager
            .update_session(SessionUpdate {
                access_token: Some("token-2".to_string()),
                ..SessionUpdate::default()
            })
            .unwrap_err();

        assert!(matches!(err, Error::NoActiveSession));
        // It never silently creates one
        assert!(manager.get_session().is_none());
    }

    #[test]
    fn delete_is_idempotent() {
        let codec = codec();
        let store = MemoryCookieStore::new();
        let settings = settings();
        let manager = SessionManager::new(&codec, &store, &settings, false);

        manager.create_session(&sample_session()).unwrap();
        manager.delete_session();
        assert!(manager.get_session().is_none());
        manager.delete_session();
        assert!(manager.get_session().is_none());
    }
}
