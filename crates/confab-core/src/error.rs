use thiserror::Error;

/// A convenience `Result` alias using [`ConfabError`].
pub type ConfabResult<T> = Result<T, ConfabError>;

/// Top-level error type for Confab.
///
/// Every error bubbles to the request boundary unchanged; nothing is retried
/// internally.
#[derive(Error, Debug)]
pub enum ConfabError {
    /// No usable credential was presented, or the token did not verify.
    #[error("Not authenticated")]
    AuthenticationRequired,

    /// The session does not exist or is not visible to the caller.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The agent run produced nodes outside the streaming protocol.
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    /// The storage engine failed while executing an operation.
    #[error("Storage error: {0}")]
    Storage(String),

    /// The streaming caller went away before the run ended.
    #[error("Stream consumer disconnected")]
    Disconnected,

    /// No engine is registered under the requested agent name.
    #[error("Unknown agent: {0}")]
    UnknownAgent(String),

    /// An error originating from an agent engine.
    #[error("Agent error: {0}")]
    Agent(String),

    /// An error in configuration parsing or validation.
    #[error("Config error: {0}")]
    Config(String),

    /// A JSON serialization or deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
