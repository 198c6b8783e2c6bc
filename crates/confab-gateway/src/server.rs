use crate::middleware::{auth_middleware, AuthConfig};
use crate::routes;
use axum::{
    middleware as axum_mw,
    routing::{delete, get, post},
    Json, Router,
};
use confab_agent::StreamDispatcher;
use confab_security::IdentityResolver;
use confab_session::SessionStore;
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    /// Session storage, shared with the dispatcher.
    pub store: Arc<dyn SessionStore>,
    /// Runs and streams agent turns.
    pub dispatcher: Arc<StreamDispatcher>,
    /// Turns request credentials into identities.
    pub resolver: Arc<dyn IdentityResolver>,
    /// Cookie settings.
    pub auth: AuthConfig,
}

/// The main gateway server.
pub struct GatewayServer;

impl GatewayServer {
    /// Build the router. Everything except `/health` and `/logout` requires
    /// a resolved identity.
    pub fn build(state: Arc<AppState>) -> Router {
        let protected = Router::new()
            .route("/", get(routes::greet))
            .route("/agents/", get(routes::list_agents))
            .route("/sessions/", get(routes::list_sessions))
            .route("/sessions/new", post(routes::new_session))
            .route("/sessions/{session_id}", delete(routes::delete_session))
            .route("/chat/", get(routes::get_chat).post(routes::post_chat))
            .route_layer(axum_mw::from_fn_with_state(state.clone(), auth_middleware));

        Router::new()
            .route("/health", get(health_handler))
            .route("/logout", post(routes::logout))
            .merge(protected)
            .with_state(state)
    }
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok", "service": "confab"}))
}
