//! Session persistence for Confab.
//!
//! Everything here funnels through a [`Bridge`]: one dedicated worker thread
//! that owns the SQLite connection and executes submitted operations strictly
//! in submission order.

/// Single-worker serialization point in front of the storage engine.
pub mod bridge;
/// Session and turn records.
pub mod session;
/// Owner-scoped session store.
pub mod store;

pub use bridge::Bridge;
pub use session::{new_session_id, Session, Turn};
pub use store::{SessionStore, SqliteSessionStore};
