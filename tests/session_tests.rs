//! Session codec and manager integration tests
//!
//! Exercises the public session API the way the gateway uses it: encode
//! and decode through the codec, CRUD through the manager over a cookie
//! store.

use chrono::Utc;
use pretty_assertions::assert_eq;
use session_gateway::Error;
use session_gateway::config::SessionConfig;
use session_gateway::session::{
    MemoryCookieStore, Session, SessionCodec, SessionManager, SessionUpdate, UserIdentity,
};

const SECRET: &str = "integration-secret-integration-secret";

fn settings() -> SessionConfig {
    SessionConfig {
        secret: SECRET.to_string(),
        cookie_name: "app_session".to_string(),
        max_age_secs: 3600,
    }
}

fn sample_session() -> Session {
    Session {
        user: UserIdentity {
            username: "jdoe".to_string(),
            display_name: "Jane Doe".to_string(),
            email: "jdoe@example.com".to_string(),
            initials: "JD".to_string(),
        },
        access_token: "access-token-1".to_string(),
        expires_at: Utc::now().timestamp_millis() + 3_600_000,
    }
}

#[test]
fn codec_round_trip_reproduces_session() {
    let codec = SessionCodec::new(SECRET, 3600);
    let session = sample_session();

    let token = codec.encode(&session).unwrap();
    let decoded = codec.decode(&token).unwrap();

    assert_eq!(decoded.user, session.user);
    assert_eq!(decoded.access_token, session.access_token);
    assert_eq!(decoded.expires_at, session.expires_at);
}

#[test]
fn codec_rejects_every_single_byte_tamper() {
    let codec = SessionCodec::new(SECRET, 3600);
    let token = codec.encode(&sample_session()).unwrap();

    for i in 0..token.len() {
        let mut tampered: Vec<u8> = token.bytes().collect();
        tampered[i] = if tampered[i] == b'x' { b'y' } else { b'x' };
        if tampered == token.as_bytes() {
            continue;
        }
        let tampered = String::from_utf8_lossy(&tampered).to_string();
        assert!(codec.decode(&tampered).is_none(), "byte {i} accepted");
    }
}

#[test]
fn codec_rejects_token_signed_with_rotated_secret() {
    let old = SessionCodec::new(SECRET, 3600);
    let new = SessionCodec::new("rotated-secret-rotated-secret-yy", 3600);

    let token = old.encode(&sample_session()).unwrap();
    assert!(new.decode(&token).is_none());
}

#[test]
fn manager_full_lifecycle() {
    let codec = SessionCodec::new(SECRET, 3600);
    let store = MemoryCookieStore::new();
    let settings = settings();
    let manager = SessionManager::new(&codec, &store, &settings, true);

    // Anonymous
    assert!(manager.get_session().is_none());

    // Login
    let session = sample_session();
    manager.create_session(&session).unwrap();
    assert_eq!(manager.get_session(), Some(session.clone()));

    // Refresh: token and expiry replaced, user preserved
    let refreshed = manager
        .update_session(SessionUpdate {
            access_token: Some("access-token-2".to_string()),
            expires_at: Some(session.expires_at + 600_000),
            user: None,
        })
        .unwrap();
    assert_eq!(refreshed.user, session.user);
    assert_eq!(refreshed.access_token, "access-token-2");

    // Logout
    manager.delete_session();
    assert!(manager.get_session().is_none());
}

#[test]
fn manager_update_without_session_never_creates_one() {
    let codec = SessionCodec::new(SECRET, 3600);
    let store = MemoryCookieStore::new();
    let settings = settings();
    let manager = SessionManager::new(&codec, &store, &settings, true);

    for _ in 0..2 {
        let err = manager
            .update_session(SessionUpdate {
                access_token: Some("access-token-2".to_string()),
                ..SessionUpdate::default()
            })
            .unwrap_err();
        assert!(matches!(err, Error::NoActiveSession));
        assert!(manager.get_session().is_none());
    }
}

#[test]
fn manager_fails_closed_on_garbage_cookie() {
    let codec = SessionCodec::new(SECRET, 3600);
    let store = MemoryCookieStore::new();
    store.insert("app_session", "definitely.not.valid");
    let settings = settings();
    let manager = SessionManager::new(&codec, &store, &settings, true);

    assert!(manager.get_session().is_none());
}

#[test]
fn repeated_create_is_idempotent() {
    let codec = SessionCodec::new(SECRET, 3600);
    let store = MemoryCookieStore::new();
    let settings = settings();
    let manager = SessionManager::new(&codec, &store, &settings, true);

    let session = sample_session();
    manager.create_session(&session).unwrap();
    manager.create_session(&session).unwrap();
    assert_eq!(manager.get_session(), Some(session));
}
