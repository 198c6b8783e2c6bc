use crate::message::{ModelRequest, ModelResponse};
use serde::{Deserialize, Serialize};

/// One step of an agent run, as produced by an agent engine.
///
/// The set of kinds is closed: the dispatcher matches it exhaustively, so a
/// new kind has to be handled there before the workspace compiles again.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionNode {
    /// Echo of the prompt that started the run.
    UserPrompt(String),
    /// The engine is about to send this request to the model.
    ModelRequest(ModelRequest),
    /// The model answered; any tool calls in the response get executed.
    CallTools(ModelResponse),
    /// The run finished.
    End(RunOutput),
}

impl ExecutionNode {
    /// Short label used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ExecutionNode::UserPrompt(_) => "user_prompt",
            ExecutionNode::ModelRequest(_) => "model_request",
            ExecutionNode::CallTools(_) => "call_tools",
            ExecutionNode::End(_) => "end",
        }
    }
}

/// Final output of a finished run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutput {
    /// The agent's final answer.
    pub output: String,
}
