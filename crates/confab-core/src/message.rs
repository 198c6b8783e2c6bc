use crate::ConfabResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ModelMessage
// ---------------------------------------------------------------------------

/// One message exchanged with a model during an agent run.
///
/// A turn payload is a JSON array of these, and every wire event is exactly
/// one of them. The `kind` tag tells a request apart from a response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ModelMessage {
    /// Sent to the model: prompts and tool results.
    Request(ModelRequest),
    /// Produced by the model: text and tool calls.
    Response(ModelResponse),
}

impl ModelMessage {
    /// Serializes a list of messages into a turn payload.
    pub fn encode_list(messages: &[ModelMessage]) -> ConfabResult<String> {
        Ok(serde_json::to_string(messages)?)
    }

    /// Parses a turn payload back into its messages.
    pub fn decode_list(payload: &str) -> ConfabResult<Vec<ModelMessage>> {
        Ok(serde_json::from_str(payload)?)
    }
}

impl From<ModelRequest> for ModelMessage {
    fn from(request: ModelRequest) -> Self {
        Self::Request(request)
    }
}

impl From<ModelResponse> for ModelMessage {
    fn from(response: ModelResponse) -> Self {
        Self::Response(response)
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// A request sent to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRequest {
    /// Ordered request parts.
    pub parts: Vec<RequestPart>,
}

impl ModelRequest {
    /// A request carrying a single user prompt.
    pub fn user_prompt(content: impl Into<UserContent>) -> Self {
        Self {
            parts: vec![RequestPart::UserPrompt {
                content: content.into(),
                timestamp: Utc::now(),
            }],
        }
    }
}

/// One part of a [`ModelRequest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "part_kind", rename_all = "kebab-case")]
pub enum RequestPart {
    /// Instructions for the model.
    SystemPrompt {
        /// Prompt text.
        content: String,
    },
    /// Input written by the user.
    UserPrompt {
        /// Text or mixed text/binary content.
        content: UserContent,
        /// When the prompt was submitted.
        timestamp: DateTime<Utc>,
    },
    /// The result of a tool call requested in an earlier response.
    ToolReturn {
        /// Tool that produced the value.
        tool_name: String,
        /// Tool output.
        content: serde_json::Value,
        /// Identifier of the originating tool call.
        tool_call_id: String,
        /// When the tool returned.
        timestamp: DateTime<Utc>,
    },
    /// Asks the model to try again, usually after a validation failure.
    RetryPrompt {
        /// Explanation sent back to the model.
        content: String,
        /// Tool the retry relates to, if any.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tool_name: Option<String>,
        /// Identifier of the originating tool call.
        tool_call_id: String,
    },
}

/// Content of a user prompt: plain text, or a list of text and binary items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserContent {
    /// A plain text prompt.
    Text(String),
    /// Multi-part content.
    Items(Vec<UserContentItem>),
}

impl From<&str> for UserContent {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for UserContent {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

/// One item of multi-part user content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserContentItem {
    /// A text fragment.
    Text(String),
    /// An attachment such as an image.
    Binary(BinaryContent),
}

/// Raw bytes with a media type. The bytes travel as base64 inside JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryContent {
    /// Raw bytes.
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
    /// MIME type, e.g. `image/png`.
    pub media_type: String,
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// A response produced by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelResponse {
    /// Ordered response parts.
    pub parts: Vec<ResponsePart>,
    /// Model that produced the response.
    #[serde(default)]
    pub model_name: Option<String>,
    /// When the response was produced.
    pub timestamp: DateTime<Utc>,
}

impl ModelResponse {
    /// A response carrying a single text part.
    pub fn text(model_name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            parts: vec![ResponsePart::Text {
                content: content.into(),
            }],
            model_name: Some(model_name.into()),
            timestamp: Utc::now(),
        }
    }

    /// Tool calls contained in this response, in order.
    pub fn tool_calls(&self) -> impl Iterator<Item = &ResponsePart> {
        self.parts
            .iter()
            .filter(|p| matches!(p, ResponsePart::ToolCall { .. }))
    }
}

/// One part of a [`ModelResponse`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "part_kind", rename_all = "kebab-case")]
pub enum ResponsePart {
    /// Text addressed to the user.
    Text {
        /// Response text.
        content: String,
    },
    /// A request to invoke a tool.
    ToolCall {
        /// Tool to invoke.
        tool_name: String,
        /// JSON arguments.
        args: serde_json::Value,
        /// Identifier echoed back in the matching tool return.
        tool_call_id: String,
    },
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
