use async_trait::async_trait;
use confab_core::{ConfabError, ConfabResult, ExecutionNode, ModelMessage};
use futures_util::stream::BoxStream;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Nodes of one agent run, in emission order.
pub type NodeStream = BoxStream<'static, ConfabResult<ExecutionNode>>;

/// The agent's reasoning and tool execution, seen from the dispatcher.
///
/// Implementations must finish a successful run with
/// [`ExecutionNode::End`]; a stream that stops without it is treated as a
/// protocol violation and the run is not committed.
#[async_trait]
pub trait AgentEngine: Send + Sync {
    /// Start a run for `prompt` with the session's prior messages as context.
    async fn run(&self, prompt: &str, history: Vec<ModelMessage>) -> ConfabResult<NodeStream>;
}

/// Named agent engines available to sessions.
pub struct AgentRegistry {
    engines: HashMap<String, Arc<dyn AgentEngine>>,
    default_agent: String,
}

impl AgentRegistry {
    /// `default_agent` is used for sessions that do not exist yet when the
    /// caller does not name an agent.
    pub fn new(default_agent: impl Into<String>) -> Self {
        Self {
            engines: HashMap::new(),
            default_agent: default_agent.into(),
        }
    }

    /// Add or replace the engine called `name`.
    pub fn register(&mut self, name: impl Into<String>, engine: Arc<dyn AgentEngine>) {
        let name = name.into();
        info!(agent = %name, "Registered agent");
        self.engines.insert(name, engine);
    }

    /// Engine called `name`, or [`ConfabError::UnknownAgent`].
    pub fn get(&self, name: &str) -> ConfabResult<Arc<dyn AgentEngine>> {
        self.engines
            .get(name)
            .cloned()
            .ok_or_else(|| ConfabError::UnknownAgent(name.to_string()))
    }

    /// Whether `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.engines.contains_key(name)
    }

    /// Registered agent names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.engines.keys().cloned().collect();
        names.sort();
        names
    }

    /// Agent used when none is named.
    pub fn default_agent(&self) -> &str {
        &self.default_agent
    }
}
