use crate::engine::{AgentEngine, NodeStream};
use async_trait::async_trait;
use confab_core::{
    ConfabResult, ExecutionNode, ModelMessage, ModelRequest, ModelResponse, RunOutput,
};
use futures_util::StreamExt;

/// Deterministic agent that answers by echoing the prompt.
///
/// Useful for exercising the full request path without a model backend.
pub struct EchoAgent {
    model_name: String,
}

impl EchoAgent {
    /// Echo agent reporting `model_name` on its responses.
    pub fn new(model_name: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
        }
    }
}

impl Default for EchoAgent {
    fn default() -> Self {
        Self::new("echo")
    }
}

#[async_trait]
impl AgentEngine for EchoAgent {
    async fn run(&self, prompt: &str, history: Vec<ModelMessage>) -> ConfabResult<NodeStream> {
        let answer = format!("{prompt} ({} earlier messages)", history.len());
        let nodes = vec![
            Ok(ExecutionNode::UserPrompt(prompt.to_string())),
            Ok(ExecutionNode::ModelRequest(ModelRequest::user_prompt(prompt))),
            Ok(ExecutionNode::CallTools(ModelResponse::text(
                self.model_name.clone(),
                answer.clone(),
            ))),
            Ok(ExecutionNode::End(RunOutput { output: answer })),
        ];
        Ok(tokio_stream::iter(nodes).boxed())
    }
}
