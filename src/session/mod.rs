//! Stateless session handling
//!
//! The session lives entirely in a signed HTTP-only cookie on the client:
//! the [`codec`] signs and verifies the payload, the [`store`] abstracts
//! cookie I/O behind a narrow trait, and the [`manager`] composes the two
//! into create/read/update/delete operations.

pub mod codec;
pub mod manager;
pub mod store;

pub use codec::{Session, SessionCodec, UserIdentity};
pub use manager::{SessionManager, SessionUpdate};
pub use store::{CookieStore, HttpCookieStore, MemoryCookieStore};
