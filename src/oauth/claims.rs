//! Access token claim inspection
//!
//! The access token payload is read *without verification*, solely to
//! derive a display identity and a client-side expiry hint. The
//! authorization server, not this gateway, is the source of truth for
//! access control; nothing here is an authorization decision.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::Deserialize;

use crate::session::UserIdentity;
use crate::{Error, Result};

/// Claims peeked from an access token payload
#[derive(Debug, Clone, Deserialize)]
pub struct AccessTokenClaims {
    /// Subject / client identifier
    pub sub: String,
    /// Expiry, epoch seconds
    #[serde(default)]
    pub exp: Option<i64>,
    /// Display name, if the token carries one
    #[serde(default, alias = "name")]
    pub displayname: Option<String>,
    /// Email address, if the token carries one
    #[serde(default)]
    pub email: Option<String>,
}

impl AccessTokenClaims {
    /// Decode the payload segment of a JWT-shaped access token.
    ///
    /// No signature check: the token was just received over TLS from the
    /// authorization server and is only used for identity display.
    pub fn peek(token: &str) -> Result<Self> {
        let payload = token
            .split('.')
            .nth(1)
            .ok_or_else(|| Error::Internal("Access token is not a JWT".to_string()))?;

        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|e| Error::Internal(format!("Malformed access token payload: {e}")))?;

        serde_json::from_slice(&bytes)
            .map_err(|e| Error::Internal(format!("Unparseable access token claims: {e}")))
    }
}

impl From<&AccessTokenClaims> for UserIdentity {
    fn from(claims: &AccessTokenClaims) -> Self {
        let display_name = claims
            .displayname
            .clone()
            .unwrap_or_else(|| claims.sub.clone());

        Self {
            username: claims.sub.clone(),
            initials: initials(&display_name, &claims.sub),
            email: claims.email.clone().unwrap_or_default(),
            display_name,
        }
    }
}

/// First letters of up to two display-name words; falls back to the first
/// two characters of the username.
fn initials(display_name: &str, username: &str) -> String {
    let letters: String = display_name
        .split_whitespace()
        .take(2)
        .filter_map(|word| word.chars().next())
        .collect();

    if letters.is_empty() {
        username.chars().take(2).collect::<String>().to_uppercase()
    } else {
        letters.to_uppercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn token_with_payload(payload: &serde_json::Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
        let body = URL_SAFE_NO_PAD.encode(payload.to_string().as_bytes());
        format!("{header}.{body}.signature")
    }

    #[test]
    fn peeks_standard_claims() {
        let token = token_with_payload(&serde_json::json!({
            "sub": "jdoe",
            "exp": 1_900_000_000,
            "displayname": "Jane Doe",
            "email": "jdoe@example.com"
        }));

        let claims = AccessTokenClaims::peek(&token).unwrap();
        assert_eq!(claims.sub, "jdoe");
        assert_eq!(claims.exp, Some(1_900_000_000));
        assert_eq!(claims.displayname.as_deref(), Some("Jane Doe"));
        assert_eq!(claims.email.as_deref(), Some("jdoe@example.com"));
    }

    #[test]
    fn accepts_name_alias() {
        let token = token_with_payload(&serde_json::json!({
            "sub": "jdoe",
            "name": "Jane Doe"
        }));

        let claims = AccessTokenClaims::peek(&token).unwrap();
        assert_eq!(claims.displayname.as_deref(), Some("Jane Doe"));
    }

    #[test]
    fn non_jwt_token_is_rejected() {
        assert!(AccessTokenClaims::peek("opaque-token").is_err());
        assert!(AccessTokenClaims::peek("").is_err());
    }

    #[test]
    fn derives_identity_with_initials() {
        let claims = AccessTokenClaims {
            sub: "jdoe".to_string(),
            exp: None,
            displayname: Some("Jane van Doe".to_string()),
            email: Some("jdoe@example.com".to_string()),
        };

        let user = UserIdentity::from(&claims);
        assert_eq!(user.username, "jdoe");
        assert_eq!(user.display_name, "Jane van Doe");
        assert_eq!(user.initials, "JV");
        assert_eq!(user.email, "jdoe@example.com");
    }

    #[test]
    fn identity_falls_back_to_subject() {
        let claims = AccessTokenClaims {
            sub: "svc-client".to_string(),
            exp: None,
            displayname: None,
            email: None,
        };

        let user = UserIdentity::from(&claims);
        assert_eq!(user.display_name, "svc-client");
        assert_eq!(user.initials, "S");
        assert_eq!(user.email, "");
    }

    #[test]
    fn empty_display_name_uses_username_characters() {
        assert_eq!(initials("", "jdoe"), "JD");
        assert_eq!(initials("Jane", "jdoe"), "J");
        assert_eq!(initials("Jane Mary Doe", "jdoe"), "JM");
    }
}
