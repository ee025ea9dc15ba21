//! Chat sessions and the in-memory session store.
//!
//! A session owns the conversation history and the database pool. Both
//! live only in process memory: ending the session (or stopping the
//! process) destroys the credentials and the transcript.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::models::chat::{ChatTurn, SessionInfo};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::db::DatabasePool;

/// Greeting seeded into every new transcript.
const GREETING: &str = "Hello! I'm a SQL assistant. Connect a database and ask me anything about it.";

/// Explicit session context passed through the orchestrator.
pub struct Session {
    /// Session identifier.
    pub id: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Append-only conversation transcript, oldest first.
    pub history: Vec<ChatTurn>,
    /// Database pool, present after a successful connect action.
    pub pool: Option<DatabasePool>,
}

impl Session {
    fn new(id: String) -> Self {
        Self {
            id,
            created_at: Utc::now(),
            history: vec![ChatTurn::assistant(GREETING)],
            pool: None,
        }
    }

    /// Installs a pool, replacing any previous one (reconnect semantics).
    pub fn attach_pool(&mut self, pool: DatabasePool) {
        self.pool = Some(pool);
    }

    /// Whether a connect action has succeeded for this session.
    pub fn is_connected(&self) -> bool {
        self.pool.is_some()
    }

    /// Appends a turn to the transcript.
    pub fn push_turn(&mut self, turn: ChatTurn) {
        self.history.push(turn);
    }

    /// Snapshot for API responses.
    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            id: self.id.clone(),
            created_at: self.created_at,
            connected: self.is_connected(),
            history: self.history.clone(),
        }
    }
}

/// In-memory session registry.
///
/// Each session sits behind its own mutex: a turn holds the lock for its
/// whole synthesize → execute → narrate chain, so there is never more than
/// one turn in flight per session, while sessions stay independent.
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Arc<Mutex<Session>>>>,
}

impl SessionStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Creates a new session and returns its snapshot.
    pub async fn create(&self) -> SessionInfo {
        let id = Uuid::new_v4().to_string();
        let session = Session::new(id.clone());
        let info = session.info();
        self.sessions
            .write()
            .await
            .insert(id, Arc::new(Mutex::new(session)));
        info
    }

    /// Looks up a session by ID.
    pub async fn get(&self, id: &str) -> Option<Arc<Mutex<Session>>> {
        self.sessions.read().await.get(id).cloned()
    }

    /// Removes a session, dropping its pool and transcript.
    pub async fn remove(&self, id: &str) -> bool {
        self.sessions.write().await.remove(id).is_some()
    }

    /// Number of live sessions.
    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
