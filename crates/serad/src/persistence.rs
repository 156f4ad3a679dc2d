//! Session persistence.
//!
//! `SessionStore` abstracts where transcripts and state snapshots go, so the
//! engine runs against plain files in production and in-memory storage in
//! tests. Store failures are surfaced to the caller, which logs and moves
//! on; persistence never fails a turn.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use async_trait::async_trait;
use sera_common::{InternalState, Message};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;
use uuid::Uuid;

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Append one message to the session transcript.
    async fn append_message(&self, session_id: Uuid, message: &Message) -> Result<()>;

    /// Overwrite the session's state snapshot.
    async fn snapshot_state(&self, session_id: Uuid, state: &InternalState) -> Result<()>;
}

// ============================================================================
// JSON file store (production)
// ============================================================================

/// File-backed store.
///
/// Layout: `<root>/<session>/transcript.jsonl` (one message per line) and
/// `<root>/<session>/state.json` (latest snapshot, pretty-printed).
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn session_dir(&self, session_id: Uuid) -> PathBuf {
        self.root.join(session_id.to_string())
    }

    async fn ensure_session_dir(&self, session_id: Uuid) -> Result<PathBuf> {
        let dir = self.session_dir(session_id);
        fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create session directory {}", dir.display()))?;
        Ok(dir)
    }
}

#[async_trait]
impl SessionStore for JsonFileStore {
    async fn append_message(&self, session_id: Uuid, message: &Message) -> Result<()> {
        let dir = self.ensure_session_dir(session_id).await?;
        let path = dir.join("transcript.jsonl");

        let mut line =
            serde_json::to_string(message).context("Failed to serialize message")?;
        line.push('\n');

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .with_context(|| format!("Failed to open {}", path.display()))?;
        file.write_all(line.as_bytes())
            .await
            .with_context(|| format!("Failed to append to {}", path.display()))?;

        debug!("Appended message to {}", path.display());
        Ok(())
    }

    async fn snapshot_state(&self, session_id: Uuid, state: &InternalState) -> Result<()> {
        let dir = self.ensure_session_dir(session_id).await?;
        let path = dir.join("state.json");

        let json =
            serde_json::to_string_pretty(state).context("Failed to serialize state snapshot")?;
        fs::write(&path, json)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;

        debug!("State snapshot saved to {}", path.display());
        Ok(())
    }
}

// ============================================================================
// Memory store (testing)
// ============================================================================

/// In-memory store with inspection accessors for tests.
#[derive(Default)]
pub struct MemoryStore {
    messages: Mutex<HashMap<Uuid, Vec<Message>>>,
    snapshots: Mutex<HashMap<Uuid, InternalState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All messages appended for a session, in order.
    pub fn messages_for(&self, session_id: Uuid) -> Vec<Message> {
        self.messages
            .lock()
            .unwrap()
            .get(&session_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Latest state snapshot for a session.
    pub fn last_snapshot(&self, session_id: Uuid) -> Option<InternalState> {
        self.snapshots.lock().unwrap().get(&session_id).cloned()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn append_message(&self, session_id: Uuid, message: &Message) -> Result<()> {
        self.messages
            .lock()
            .unwrap()
            .entry(session_id)
            .or_default()
            .push(message.clone());
        Ok(())
    }

    async fn snapshot_state(&self, session_id: Uuid, state: &InternalState) -> Result<()> {
        self.snapshots
            .lock()
            .unwrap()
            .insert(session_id, state.clone());
        Ok(())
    }
}
