//! HTTP gateway — auth boundary, flow controllers, router, server

pub mod auth;
pub mod edge;
pub mod flows;
pub mod router;
pub mod server;
pub mod upstream;

pub use router::{AppState, create_router};
pub use server::Gateway;
pub use upstream::BackendClient;
