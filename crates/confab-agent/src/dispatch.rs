use crate::engine::AgentRegistry;
use crate::wire;
use bytes::Bytes;
use confab_core::{ConfabError, ConfabResult, ExecutionNode, Identity, ModelMessage};
use confab_session::{SessionStore, Turn};
use futures_util::StreamExt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Chunks buffered between the dispatcher task and the response body.
const SINK_CAPACITY: usize = 32;

/// Where a run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    /// Nothing sent yet.
    Start,
    /// The prompt line has been flushed.
    PromptEmitted,
    /// The engine is producing nodes.
    Executing,
    /// The engine finished; the turn is being committed.
    Ended,
}

/// Everything needed to start one streamed run.
#[derive(Debug, Clone)]
pub struct RunRequest {
    /// Caller the session is scoped to.
    pub identity: Identity,
    /// Session the run belongs to.
    pub session_id: String,
    /// Raw user prompt, echoed as the first line.
    pub prompt: String,
    /// Agent for a session that does not exist yet. Ignored once the session
    /// has been created; its stored agent always wins.
    pub agent_name: Option<String>,
}

/// Outcome of a run that reached [`DispatchState::Ended`] and was committed.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Agent that ran.
    pub agent_name: String,
    /// Wire events flushed after the prompt line.
    pub events: usize,
    /// Final output carried by the end node.
    pub output: String,
    /// The committed turn.
    pub turn: Turn,
}

/// Drives agent runs and streams them to the caller.
///
/// Per run: the prompt line is flushed before any other work, accepted nodes
/// are flushed one per line in emission order, and the run's messages are
/// committed with exactly one `append_turn` once the engine signals the end.
/// A run that fails or loses its consumer before that point commits nothing.
pub struct StreamDispatcher {
    store: Arc<dyn SessionStore>,
    registry: Arc<AgentRegistry>,
}

impl StreamDispatcher {
    /// Dispatcher over `store` running engines from `registry`.
    pub fn new(store: Arc<dyn SessionStore>, registry: Arc<AgentRegistry>) -> Self {
        Self { store, registry }
    }

    /// Engines this dispatcher can run.
    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    /// Run on a background task; the receiver yields the response chunks.
    ///
    /// Dropping the receiver is how a client disconnect reaches the run.
    pub fn spawn(self: &Arc<Self>, request: RunRequest) -> mpsc::Receiver<Bytes> {
        let (tx, rx) = mpsc::channel(SINK_CAPACITY);
        let dispatcher = Arc::clone(self);
        tokio::spawn(async move {
            let session_id = request.session_id.clone();
            match dispatcher.run(request, &tx).await {
                Ok(_) => {}
                Err(ConfabError::Disconnected) => {
                    info!(session_id = %session_id, "Client disconnected; run not committed");
                }
                Err(e) => {
                    warn!(session_id = %session_id, error = %e, "Run aborted; stream truncated");
                }
            }
        });
        rx
    }

    /// Drive one run, writing chunks to `sink`.
    pub async fn run(
        &self,
        request: RunRequest,
        sink: &mpsc::Sender<Bytes>,
    ) -> ConfabResult<RunSummary> {
        let RunRequest {
            identity,
            session_id,
            prompt,
            agent_name: requested_agent,
        } = request;
        let mut state = Transitions::new(&session_id);

        flush(sink, wire::encode_prompt(&prompt)).await?;
        state.enter(DispatchState::PromptEmitted);

        let agent_name = self
            .resolve_agent(&session_id, &identity, requested_agent)
            .await?;
        let engine = self.registry.get(&agent_name)?;
        let history = self.store.get_messages(&session_id, &identity).await?;
        debug!(
            session_id = %session_id,
            agent = %agent_name,
            history = history.len(),
            "Starting agent run"
        );
        let mut nodes = engine.run(&prompt, history).await?;
        state.enter(DispatchState::Executing);

        let mut new_messages: Vec<ModelMessage> = Vec::new();
        let mut output = None;
        while let Some(node) = nodes.next().await {
            let message = match node? {
                ExecutionNode::UserPrompt(_) => continue,
                ExecutionNode::ModelRequest(request) => ModelMessage::Request(request),
                ExecutionNode::CallTools(response) => ModelMessage::Response(response),
                ExecutionNode::End(run_output) => {
                    output = Some(run_output.output);
                    break;
                }
            };
            flush(sink, wire::encode_event(&message)?).await?;
            new_messages.push(message);
        }
        drop(nodes);

        let Some(output) = output else {
            return Err(ConfabError::ProtocolViolation(
                "node stream ended without a completion node".into(),
            ));
        };
        if sink.is_closed() {
            return Err(ConfabError::Disconnected);
        }
        state.enter(DispatchState::Ended);

        let payload = ModelMessage::encode_list(&new_messages)?;
        let turn = self
            .store
            .append_turn(&session_id, &identity, &agent_name, payload)
            .await?;
        info!(
            session_id = %session_id,
            agent = %agent_name,
            events = new_messages.len(),
            seq = turn.seq,
            "Run committed"
        );

        Ok(RunSummary {
            agent_name,
            events: new_messages.len(),
            output,
            turn,
        })
    }

    async fn resolve_agent(
        &self,
        session_id: &str,
        identity: &Identity,
        requested: Option<String>,
    ) -> ConfabResult<String> {
        match self.store.get_agent_for(session_id, identity).await {
            Ok(stored) => Ok(stored),
            Err(ConfabError::NotFound(_)) => {
                Ok(requested.unwrap_or_else(|| self.registry.default_agent().to_string()))
            }
            Err(e) => Err(e),
        }
    }
}

async fn flush(sink: &mpsc::Sender<Bytes>, chunk: Bytes) -> ConfabResult<()> {
    sink.send(chunk)
        .await
        .map_err(|_| ConfabError::Disconnected)
}

struct Transitions<'a> {
    session_id: &'a str,
    current: DispatchState,
}

impl<'a> Transitions<'a> {
    fn new(session_id: &'a str) -> Self {
        Self {
            session_id,
            current: DispatchState::Start,
        }
    }

    fn enter(&mut self, next: DispatchState) {
        debug!(
            session_id = %self.session_id,
            from = ?self.current,
            to = ?next,
            "Dispatch state change"
        );
        self.current = next;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::EchoAgent;
    use confab_session::SqliteSessionStore;

    async fn echo_dispatcher() -> (Arc<StreamDispatcher>, Arc<SqliteSessionStore>) {
        let store = Arc::new(SqliteSessionStore::open_in_memory().await.unwrap());
        let mut registry = AgentRegistry::new("echo");
        registry.register("echo", Arc::new(EchoAgent::default()));
        let dispatcher = Arc::new(StreamDispatcher::new(store.clone(), Arc::new(registry)));
        (dispatcher, store)
    }

    fn request(session_id: &str, prompt: &str) -> RunRequest {
        RunRequest {
            identity: Identity::new("alice"),
            session_id: session_id.into(),
            prompt: prompt.into(),
            agent_name: None,
        }
    }

    #[tokio::test]
    async fn spawned_run_streams_and_commits() {
        let (dispatcher, store) = echo_dispatcher().await;
        let mut rx = dispatcher.spawn(request("s1", "hello"));

        let mut chunks = Vec::new();
        while let Some(chunk) = rx.recv().await {
            chunks.push(chunk);
        }
        assert_eq!(&chunks[0][..], b"hello\n");
        assert_eq!(chunks.len(), 3);

        // The sender is dropped only after the commit finished.
        let turns = store
            .get_transcript("s1", &Identity::new("alice"))
            .await
            .unwrap();
        assert_eq!(turns.len(), 1);
    }

    #[tokio::test]
    async fn history_feeds_the_next_run() {
        let (dispatcher, _store) = echo_dispatcher().await;
        let (tx, _rx) = mpsc::channel(16);

        dispatcher.run(request("s1", "one"), &tx).await.unwrap();
        let second = dispatcher.run(request("s1", "two"), &tx).await.unwrap();

        assert_eq!(second.output, "two (2 earlier messages)");
        assert_eq!(second.agent_name, "echo");
    }
}
