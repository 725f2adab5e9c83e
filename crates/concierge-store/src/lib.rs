//! Session persistence.
//!
//! Two implementations of the session-store port: an in-memory store for
//! tests and embedded use, and an append-only JSONL file store. Both treat
//! saves as snapshots; `load_latest` returns the most recent one, so a
//! re-saved session always wins over its older copies.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use concierge_protocol::{
    ChatMessage, ChatSession, EngineError, EngineResult, SessionStorePort, UserId,
};
use parking_lot::{Mutex, RwLock};
use tokio::fs::{self, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, instrument, warn};

/// In-memory snapshot store. Keeps every saved snapshot per user plus an
/// append-only message log per session.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, Vec<ChatSession>>>,
    messages: RwLock<HashMap<String, Vec<ChatMessage>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages logged for a session via `save_messages`.
    pub fn logged_messages(&self, session: &ChatSession) -> Vec<ChatMessage> {
        self.messages
            .read()
            .get(session.session_id.as_str())
            .cloned()
            .unwrap_or_default()
    }

    pub fn snapshot_count(&self, user_id: &UserId) -> usize {
        self.sessions
            .read()
            .get(user_id.as_str())
            .map_or(0, Vec::len)
    }
}

#[async_trait]
impl SessionStorePort for MemorySessionStore {
    async fn load_latest(&self, user_id: &UserId) -> EngineResult<Option<ChatSession>> {
        Ok(self
            .sessions
            .read()
            .get(user_id.as_str())
            .and_then(|snapshots| snapshots.last().cloned()))
    }

    async fn save_session(&self, session: &ChatSession) -> EngineResult<()> {
        self.sessions
            .write()
            .entry(session.user_id.as_str().to_owned())
            .or_default()
            .push(session.clone());
        Ok(())
    }

    async fn save_messages(
        &self,
        session: &ChatSession,
        new_messages: &[ChatMessage],
    ) -> EngineResult<()> {
        self.messages
            .write()
            .entry(session.session_id.as_str().to_owned())
            .or_default()
            .extend_from_slice(new_messages);
        Ok(())
    }
}

/// Append-only JSONL file store.
///
/// Layout under the root: `sessions/<user_id>.jsonl` holds one session
/// snapshot per line; `messages/<session_id>.jsonl` holds one message per
/// line. Appends to the same user's log are serialized by a per-user lock;
/// unparseable lines are skipped on read, so a torn final write costs one
/// snapshot, not the log.
#[derive(Debug)]
pub struct FileSessionStore {
    root: PathBuf,
    write_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl FileSessionStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_locks: Mutex::new(HashMap::new()),
        }
    }

    fn session_path(&self, user_id: &UserId) -> PathBuf {
        self.root
            .join("sessions")
            .join(format!("{}.jsonl", user_id.as_str()))
    }

    fn message_path(&self, session: &ChatSession) -> PathBuf {
        self.root
            .join("messages")
            .join(format!("{}.jsonl", session.session_id.as_str()))
    }

    fn lock_for(&self, user_id: &UserId) -> Arc<tokio::sync::Mutex<()>> {
        let mut guard = self.write_locks.lock();
        guard
            .entry(user_id.as_str().to_owned())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    async fn append_line(path: &Path, line: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create store dir {parent:?}"))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .with_context(|| format!("failed opening log {path:?}"))?;
        file.write_all(line.as_bytes()).await?;
        file.write_all(b"\n").await?;
        file.flush().await?;
        Ok(())
    }

    async fn read_latest_snapshot(path: &Path) -> Result<Option<ChatSession>> {
        if !fs::try_exists(path).await.unwrap_or(false) {
            return Ok(None);
        }
        let file = OpenOptions::new().read(true).open(path).await?;
        let mut reader = BufReader::new(file).lines();
        let mut latest = None;
        while let Some(line) = reader.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<ChatSession>(&line) {
                Ok(session) => latest = Some(session),
                Err(error) => {
                    warn!(%error, "skipping unparseable session snapshot line");
                }
            }
        }
        Ok(latest)
    }
}

fn to_store_error(error: anyhow::Error) -> EngineError {
    EngineError::Store(error.to_string())
}

#[async_trait]
impl SessionStorePort for FileSessionStore {
    #[instrument(skip(self), fields(user_id = %user_id))]
    async fn load_latest(&self, user_id: &UserId) -> EngineResult<Option<ChatSession>> {
        let path = self.session_path(user_id);
        let latest = Self::read_latest_snapshot(&path)
            .await
            .map_err(to_store_error)?;
        debug!(found = latest.is_some(), "latest session resolved");
        Ok(latest)
    }

    #[instrument(
        skip(self, session),
        fields(session_id = %session.session_id, user_id = %session.user_id)
    )]
    async fn save_session(&self, session: &ChatSession) -> EngineResult<()> {
        let line = serde_json::to_string(session)?;
        let lock = self.lock_for(&session.user_id);
        let _guard = lock.lock().await;
        Self::append_line(&self.session_path(&session.user_id), &line)
            .await
            .map_err(to_store_error)?;
        debug!("session snapshot appended");
        Ok(())
    }

    #[instrument(
        skip(self, session, new_messages),
        fields(session_id = %session.session_id, count = new_messages.len())
    )]
    async fn save_messages(
        &self,
        session: &ChatSession,
        new_messages: &[ChatMessage],
    ) -> EngineResult<()> {
        let path = self.message_path(session);
        let lock = self.lock_for(&session.user_id);
        let _guard = lock.lock().await;
        for message in new_messages {
            let line = serde_json::to_string(message)?;
            Self::append_line(&path, &line).await.map_err(to_store_error)?;
        }
        Ok(())
    }
}
