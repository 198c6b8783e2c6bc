use chrono::{DateTime, Utc};
use confab_core::Identity;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An owner-scoped conversation thread bound to one agent.
///
/// `agent_name` and `owner` are fixed when the session is first written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub last_message_at: DateTime<Utc>,
    pub agent_name: String,
    pub owner: Identity,
}

impl Session {
    /// Title given to sessions created implicitly: `"{agent} YYYY-MM-DD HH:MM"`.
    pub fn default_title(agent_name: &str, at: DateTime<Utc>) -> String {
        format!("{agent_name} {}", at.format("%Y-%m-%d %H:%M"))
    }
}

/// One appended unit of conversation content produced by a single run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    /// Store-assigned, strictly increasing sequence number.
    pub seq: i64,
    pub session_id: String,
    /// Serialized JSON array of model messages.
    pub payload: String,
    pub created_at: DateTime<Utc>,
}

/// Generate a fresh session identifier: `session-<unix seconds>.<micros>-<8 hex>`.
pub fn new_session_id() -> String {
    let now = Utc::now();
    let suffix = Uuid::new_v4().simple().to_string();
    format!(
        "session-{}.{:06}-{}",
        now.timestamp(),
        now.timestamp_subsec_micros(),
        &suffix[..8]
    )
}
