//! Session management.
//!
//! One session per conversation, addressed by UUID. Turns within a session
//! are serialized through the per-session lock; turns in different sessions
//! run concurrently.

use std::collections::HashMap;
use std::sync::Arc;

use sera_common::{Conversation, InternalState};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

/// One conversation with its coherence state.
pub struct Session {
    pub id: Uuid,
    pub conversation: Conversation,
    pub state: InternalState,
}

impl Session {
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            conversation: Conversation::new(),
            state: InternalState::new(),
        }
    }
}

/// Thread-safe per-session handle
pub type SharedSession = Arc<Mutex<Session>>;

/// Registry of live sessions.
///
/// The outer lock guards only the map; turn processing holds the inner
/// session lock, so a slow turn in one session never blocks another session.
pub struct SessionManager {
    sessions: RwLock<HashMap<Uuid, SharedSession>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Create a fresh session and return its id.
    pub async fn create_session(&self) -> Uuid {
        let id = Uuid::new_v4();
        let session = Arc::new(Mutex::new(Session::new(id)));
        self.sessions.write().await.insert(id, session);
        id
    }

    /// Look up a session handle.
    pub async fn get(&self, id: Uuid) -> Option<SharedSession> {
        self.sessions.read().await.get(&id).cloned()
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}
