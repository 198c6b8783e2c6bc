//! Core types and error definitions for Confab.
//!
//! This crate provides the foundational types shared across all Confab crates:
//! the unified error type, the caller identity, and the message model that is
//! both persisted as turn payloads and streamed to callers as wire events.
//!
//! # Main types
//!
//! - [`ConfabError`]: Unified error enum for all Confab subsystems.
//! - [`ConfabResult`]: Convenience alias for `Result<T, ConfabError>`.
//! - [`Identity`]: The authenticated caller every store operation is scoped to.
//! - [`ModelMessage`]: One request to, or response from, a model.
//! - [`ExecutionNode`]: One step of an agent run.

/// Unified error type.
pub mod error;
/// Caller identity.
pub mod identity;
/// Model request/response messages.
pub mod message;
/// Agent execution nodes.
pub mod node;

pub use error::{ConfabError, ConfabResult};
pub use identity::Identity;
pub use message::{
    BinaryContent, ModelMessage, ModelRequest, ModelResponse, RequestPart, ResponsePart,
    UserContent, UserContentItem,
};
pub use node::{ExecutionNode, RunOutput};
