//! HTTP adapter for the sync engine.

pub mod auth;
pub mod routes;

pub use auth::{auth_middleware, ApiKeyStore, AuthUser};
pub use routes::{router, ApiError, AppState};
