use crate::error::ApiError;
use crate::server::AppState;
use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    Extension, Form, Json,
};
use confab_agent::RunRequest;
use confab_core::{ConfabError, Identity, ModelMessage};
use confab_session::{new_session_id, Session};
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::info;

type ApiResult<T> = Result<T, ApiError>;

/// Body of `POST /sessions/new`.
#[derive(Debug, Default, Deserialize)]
pub struct NewSessionRequest {
    /// Agent to bind; the registry default when absent.
    pub agent_name: Option<String>,
}

/// Reply of `POST /sessions/new`.
#[derive(Debug, Serialize, Deserialize)]
pub struct NewSessionResponse {
    /// Freshly generated session id.
    pub session_id: String,
    /// Agent the session is bound to.
    pub agent_name: String,
}

/// Query of `GET /chat/`.
#[derive(Debug, Deserialize)]
pub struct ChatQuery {
    /// Session whose history is returned.
    pub session_id: String,
}

/// Form fields of `POST /chat/`.
#[derive(Debug, Deserialize)]
pub struct ChatForm {
    /// User prompt for the run.
    pub prompt: String,
    /// Target session; created on first commit.
    pub session_id: String,
    /// Agent for a session that does not exist yet.
    #[serde(default)]
    pub agent_name: Option<String>,
}

/// `GET /`: greets the caller.
pub async fn greet(Extension(identity): Extension<Identity>) -> String {
    format!("Hello, {identity}!")
}

/// `GET /agents/`: registered agent names.
pub async fn list_agents(State(state): State<Arc<AppState>>) -> Json<Vec<String>> {
    Json(state.dispatcher.registry().names())
}

/// `GET /sessions/`: the caller's sessions, most recent first.
pub async fn list_sessions(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
) -> ApiResult<Json<Vec<Session>>> {
    Ok(Json(state.store.list_sessions(&identity).await?))
}

/// Create an empty session bound to the requested (or default) agent.
pub async fn new_session(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Json(body): Json<NewSessionRequest>,
) -> ApiResult<Json<NewSessionResponse>> {
    let registry = state.dispatcher.registry();
    let agent_name = requested_agent(body.agent_name)
        .unwrap_or_else(|| registry.default_agent().to_string());
    if !registry.contains(&agent_name) {
        return Err(ConfabError::UnknownAgent(agent_name).into());
    }

    let session = state
        .store
        .ensure_session(&new_session_id(), &identity, &agent_name)
        .await?;
    info!(session_id = %session.id, agent = %agent_name, "Session created");
    Ok(Json(NewSessionResponse {
        session_id: session.id,
        agent_name,
    }))
}

/// `DELETE /sessions/{session_id}`.
pub async fn delete_session(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Path(session_id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let success = state.store.delete_session(&session_id, &identity).await?;
    Ok(Json(serde_json::json!({ "success": success })))
}

/// Decoded message history of one session.
pub async fn get_chat(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<ChatQuery>,
) -> ApiResult<Json<Vec<ModelMessage>>> {
    Ok(Json(
        state
            .store
            .get_messages(&query.session_id, &identity)
            .await?,
    ))
}

/// Run the session's agent and stream the result as `text/plain` lines.
///
/// The body ends when the run ends; a failed run leaves it truncated.
pub async fn post_chat(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Form(form): Form<ChatForm>,
) -> ApiResult<Response> {
    let agent_name = requested_agent(form.agent_name);
    if let Some(name) = &agent_name {
        if !state.dispatcher.registry().contains(name) {
            return Err(ConfabError::UnknownAgent(name.clone()).into());
        }
    }

    let rx = state.dispatcher.spawn(RunRequest {
        identity,
        session_id: form.session_id,
        prompt: form.prompt,
        agent_name,
    });
    let body = Body::from_stream(ReceiverStream::new(rx).map(Ok::<_, Infallible>));
    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        body,
    )
        .into_response())
}

/// `POST /logout`: clears the access token cookie.
pub async fn logout(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        [(header::SET_COOKIE, state.auth.clear_cookie())],
        Json(serde_json::json!({ "detail": "Logged out" })),
    )
}

fn requested_agent(name: Option<String>) -> Option<String> {
    name.filter(|n| !n.trim().is_empty())
}
