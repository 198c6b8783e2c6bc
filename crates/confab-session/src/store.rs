use crate::bridge::{storage_error, Bridge};
use crate::session::{Session, Turn};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use confab_core::{ConfabError, ConfabResult, Identity, ModelMessage};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use tracing::{debug, info};

const SCHEMA: &str = "
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS sessions (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    created_at TEXT NOT NULL,
    last_message_at TEXT NOT NULL,
    agent_name TEXT NOT NULL,
    owner TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS messages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id TEXT NOT NULL REFERENCES sessions(id),
    message_list TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_sessions_owner ON sessions(owner, last_message_at);
CREATE INDEX IF NOT EXISTS idx_messages_session ON messages(session_id, id);
";

const SESSION_COLUMNS: &str = "id, title, created_at, last_message_at, agent_name, owner";

/// Owner-scoped storage for sessions and their turns.
///
/// Every operation takes the caller's [`Identity`]. A session owned by someone
/// else is treated exactly like a missing one: collections come back empty,
/// single lookups fail with [`ConfabError::NotFound`], and the message does not
/// reveal which of the two cases applied.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Create the session if it does not exist. Never changes the agent or
    /// owner of an existing session.
    async fn ensure_session(
        &self,
        id: &str,
        owner: &Identity,
        agent_name: &str,
    ) -> ConfabResult<Session>;

    /// Ensure the session, append one turn and bump its last-activity time.
    async fn append_turn(
        &self,
        id: &str,
        owner: &Identity,
        agent_name: &str,
        payload: String,
    ) -> ConfabResult<Turn>;

    /// The owner's sessions, most recently active first.
    async fn list_sessions(&self, owner: &Identity) -> ConfabResult<Vec<Session>>;

    /// Turns of a session in creation order; empty when not visible.
    async fn get_transcript(&self, id: &str, owner: &Identity) -> ConfabResult<Vec<Turn>>;

    /// Agent bound to the session.
    async fn get_agent_for(&self, id: &str, owner: &Identity) -> ConfabResult<String>;

    /// Remove the session and all its turns. Returns `false` without effect
    /// when the session is not visible to `owner`.
    async fn delete_session(&self, id: &str, owner: &Identity) -> ConfabResult<bool>;

    /// The transcript decoded and concatenated into one message history.
    async fn get_messages(&self, id: &str, owner: &Identity) -> ConfabResult<Vec<ModelMessage>> {
        let mut messages = Vec::new();
        for turn in self.get_transcript(id, owner).await? {
            messages.extend(ModelMessage::decode_list(&turn.payload)?);
        }
        Ok(messages)
    }
}

// ---------------------------------------------------------------------------
// SqliteSessionStore
// ---------------------------------------------------------------------------

/// SQLite-backed [`SessionStore`]. All statements run on the [`Bridge`] worker.
#[derive(Clone)]
pub struct SqliteSessionStore {
    bridge: Bridge,
}

impl SqliteSessionStore {
    /// Open (or create) the database file at `path`, creating parent
    /// directories as needed.
    pub async fn open(path: impl AsRef<Path>) -> ConfabResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let store = Self::with_bridge(Bridge::open(path).await?).await?;
        info!(path = %path.display(), "Session store opened");
        Ok(store)
    }

    /// A store backed by a private in-memory database.
    pub async fn open_in_memory() -> ConfabResult<Self> {
        Self::with_bridge(Bridge::open_in_memory().await?).await
    }

    async fn with_bridge(bridge: Bridge) -> ConfabResult<Self> {
        bridge
            .submit(|conn| conn.execute_batch(SCHEMA).map_err(storage_error))
            .await?;
        Ok(Self { bridge })
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn ensure_session(
        &self,
        id: &str,
        owner: &Identity,
        agent_name: &str,
    ) -> ConfabResult<Session> {
        let (id, owner, agent_name) = (id.to_string(), owner.clone(), agent_name.to_string());
        self.bridge
            .submit(move |conn| ensure_session_row(conn, &id, &owner, &agent_name))
            .await
    }

    async fn append_turn(
        &self,
        id: &str,
        owner: &Identity,
        agent_name: &str,
        payload: String,
    ) -> ConfabResult<Turn> {
        let (id, owner, agent_name) = (id.to_string(), owner.clone(), agent_name.to_string());
        self.bridge
            .submit(move |conn| {
                // Ensure, insert and timestamp bump commit together.
                let tx = conn.transaction().map_err(storage_error)?;
                ensure_session_row(&tx, &id, &owner, &agent_name)?;

                let now = Utc::now();
                let stamp = format_timestamp(now);
                tx.execute(
                    "INSERT INTO messages (session_id, message_list, created_at) VALUES (?1, ?2, ?3)",
                    params![id, payload, stamp],
                )
                .map_err(storage_error)?;
                let seq = tx.last_insert_rowid();
                tx.execute(
                    "UPDATE sessions SET last_message_at = ?1 WHERE id = ?2",
                    params![stamp, id],
                )
                .map_err(storage_error)?;
                tx.commit().map_err(storage_error)?;

                debug!(session_id = %id, seq, "Turn appended");
                Ok(Turn {
                    seq,
                    session_id: id,
                    payload,
                    created_at: now,
                })
            })
            .await
    }

    async fn list_sessions(&self, owner: &Identity) -> ConfabResult<Vec<Session>> {
        let owner = owner.clone();
        self.bridge
            .submit(move |conn| {
                let mut stmt = conn
                    .prepare(&format!(
                        "SELECT {SESSION_COLUMNS} FROM sessions WHERE owner = ?1 \
                         ORDER BY last_message_at DESC, rowid DESC"
                    ))
                    .map_err(storage_error)?;
                let rows = stmt
                    .query_map(params![owner.as_str()], session_from_row)
                    .map_err(storage_error)?;
                rows.collect::<Result<Vec<_>, _>>().map_err(storage_error)
            })
            .await
    }

    async fn get_transcript(&self, id: &str, owner: &Identity) -> ConfabResult<Vec<Turn>> {
        let (id, owner) = (id.to_string(), owner.clone());
        self.bridge
            .submit(move |conn| {
                let mut stmt = conn
                    .prepare(
                        "SELECT m.id, m.session_id, m.message_list, m.created_at \
                         FROM messages m JOIN sessions s ON s.id = m.session_id \
                         WHERE m.session_id = ?1 AND s.owner = ?2 \
                         ORDER BY m.id",
                    )
                    .map_err(storage_error)?;
                let rows = stmt
                    .query_map(params![id, owner.as_str()], turn_from_row)
                    .map_err(storage_error)?;
                rows.collect::<Result<Vec<_>, _>>().map_err(storage_error)
            })
            .await
    }

    async fn get_agent_for(&self, id: &str, owner: &Identity) -> ConfabResult<String> {
        let (id, owner) = (id.to_string(), owner.clone());
        self.bridge
            .submit(move |conn| {
                conn.query_row(
                    "SELECT agent_name FROM sessions WHERE id = ?1 AND owner = ?2",
                    params![id, owner.as_str()],
                    |row| row.get::<_, String>(0),
                )
                .optional()
                .map_err(storage_error)?
                .ok_or_else(|| not_visible(&id))
            })
            .await
    }

    async fn delete_session(&self, id: &str, owner: &Identity) -> ConfabResult<bool> {
        let (id, owner) = (id.to_string(), owner.clone());
        self.bridge
            .submit(move |conn| {
                let tx = conn.transaction().map_err(storage_error)?;
                let visible = tx
                    .query_row(
                        "SELECT 1 FROM sessions WHERE id = ?1 AND owner = ?2",
                        params![id, owner.as_str()],
                        |_| Ok(()),
                    )
                    .optional()
                    .map_err(storage_error)?
                    .is_some();
                if !visible {
                    return Ok(false);
                }

                let turns = tx
                    .execute("DELETE FROM messages WHERE session_id = ?1", params![id])
                    .map_err(storage_error)?;
                tx.execute("DELETE FROM sessions WHERE id = ?1", params![id])
                    .map_err(storage_error)?;
                tx.commit().map_err(storage_error)?;

                info!(session_id = %id, turns, "Session deleted");
                Ok(true)
            })
            .await
    }
}

// ---------------------------------------------------------------------------
// Row helpers (run on the bridge worker)
// ---------------------------------------------------------------------------

fn ensure_session_row(
    conn: &Connection,
    id: &str,
    owner: &Identity,
    agent_name: &str,
) -> ConfabResult<Session> {
    let existing = conn
        .query_row(
            &format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?1"),
            params![id],
            session_from_row,
        )
        .optional()
        .map_err(storage_error)?;

    match existing {
        Some(session) if &session.owner == owner => Ok(session),
        Some(_) => Err(not_visible(id)),
        None => {
            let now = Utc::now();
            let session = Session {
                id: id.to_string(),
                title: Session::default_title(agent_name, now),
                created_at: now,
                last_message_at: now,
                agent_name: agent_name.to_string(),
                owner: owner.clone(),
            };
            conn.execute(
                &format!("INSERT INTO sessions ({SESSION_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)"),
                params![
                    session.id,
                    session.title,
                    format_timestamp(session.created_at),
                    format_timestamp(session.last_message_at),
                    session.agent_name,
                    session.owner.as_str(),
                ],
            )
            .map_err(storage_error)?;
            info!(session_id = %id, agent = %agent_name, "Session created");
            Ok(session)
        }
    }
}

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<Session> {
    Ok(Session {
        id: row.get(0)?,
        title: row.get(1)?,
        created_at: parse_timestamp(2, row.get(2)?)?,
        last_message_at: parse_timestamp(3, row.get(3)?)?,
        agent_name: row.get(4)?,
        owner: Identity::new(row.get::<_, String>(5)?),
    })
}

fn turn_from_row(row: &Row<'_>) -> rusqlite::Result<Turn> {
    Ok(Turn {
        seq: row.get(0)?,
        session_id: row.get(1)?,
        payload: row.get(2)?,
        created_at: parse_timestamp(3, row.get(3)?)?,
    })
}

/// Fixed-width RFC 3339 so lexical order in SQL matches time order.
fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(column: usize, raw: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(e)))
}

fn not_visible(id: &str) -> ConfabError {
    ConfabError::NotFound(format!("session '{id}'"))
}
