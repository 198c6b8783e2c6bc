//! Agent runs for Confab.
//!
//! An [`AgentEngine`] turns a prompt plus prior history into a stream of
//! [`ExecutionNode`](confab_core::ExecutionNode)s. The [`StreamDispatcher`]
//! drives one run, flushes accepted nodes to the caller as line-delimited
//! wire events, and commits the run's messages as a single turn.

/// Run driver: streams nodes and commits the turn.
pub mod dispatch;
/// Built-in deterministic agent.
pub mod echo;
/// Engine seam and the named engine registry.
pub mod engine;
/// Line-delimited wire encoding.
pub mod wire;

pub use dispatch::{DispatchState, RunRequest, RunSummary, StreamDispatcher};
pub use echo::EchoAgent;
pub use engine::{AgentEngine, AgentRegistry, NodeStream};
