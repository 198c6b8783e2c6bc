//! HTTP transport shell for Confab.
//!
//! Every route except `/health` and `/logout` runs behind
//! [`middleware::auth_middleware`], which resolves the caller's
//! [`Identity`](confab_core::Identity) before any handler touches storage.

/// Mapping from [`ConfabError`](confab_core::ConfabError) to HTTP responses.
pub mod error;
/// Authentication middleware.
pub mod middleware;
/// Route handlers.
pub mod routes;
/// Router assembly and shared state.
pub mod server;

pub use error::ApiError;
pub use middleware::AuthConfig;
pub use server::{AppState, GatewayServer};
