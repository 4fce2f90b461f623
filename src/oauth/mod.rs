//! OAuth2 token exchange
//!
//! Two grant flows against the external authorization server:
//! client-credentials (development) and JWT-bearer assertion exchange
//! (production SSO). This gateway never issues tokens of its own.

pub mod claims;
pub mod exchange;

pub use claims::AccessTokenClaims;
pub use exchange::{TokenExchanger, TokenResponse, build_http_client};
