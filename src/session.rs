//! Session history boundary: storage, retrieval, archival.
//!
//! Persistent storage is a collaborator, not part of this crate's core;
//! [`MemoryStore`] is the in-process default so the gateway runs without
//! external state.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use crate::error::Result;

/// One persisted history entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredMessage {
    pub role: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools_used: Option<Vec<String>>,
    pub timestamp: DateTime<Utc>,
}

/// A conversation's persisted history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub key: String,
    pub messages: Vec<StoredMessage>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl Session {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            messages: Vec::new(),
            metadata: Map::new(),
        }
    }

    /// Append one entry.
    pub fn add_message(
        &mut self,
        role: impl Into<String>,
        content: impl Into<String>,
        tools_used: Option<Vec<String>>,
    ) {
        self.messages.push(StoredMessage {
            role: role.into(),
            content: content.into(),
            tools_used,
            timestamp: Utc::now(),
        });
    }

    /// The last `max_messages` entries, oldest first.
    pub fn get_history(&self, max_messages: usize) -> Vec<StoredMessage> {
        let start = self.messages.len().saturating_sub(max_messages);
        self.messages[start..].to_vec()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

/// History-persistence collaborator.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Fetch the session for `key`, creating an empty one if absent.
    async fn get_or_create(&self, key: &str) -> Session;

    /// Fetch without creating.
    async fn get(&self, key: &str) -> Option<Session>;

    /// Persist the session.
    async fn save(&self, session: &Session) -> Result<()>;

    /// Drop any cached state for `key`.
    async fn invalidate(&self, key: &str);
}

/// In-process session store.
#[derive(Default)]
pub struct MemoryStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn get_or_create(&self, key: &str) -> Session {
        if let Some(session) = self.sessions.read().await.get(key) {
            return session.clone();
        }
        let session = Session::new(key);
        self.sessions
            .write()
            .await
            .entry(key.to_string())
            .or_insert_with(|| session.clone());
        session
    }

    async fn get(&self, key: &str) -> Option<Session> {
        self.sessions.read().await.get(key).cloned()
    }

    async fn save(&self, session: &Session) -> Result<()> {
        self.sessions
            .write()
            .await
            .insert(session.key.clone(), session.clone());
        Ok(())
    }

    async fn invalidate(&self, key: &str) {
        self.sessions.write().await.remove(key);
    }
}

/// Memory-consolidation collaborator, always invoked fire-and-forget.
#[async_trait]
pub trait Archiver: Send + Sync {
    async fn archive(&self, session: Session) -> Result<()>;
}

/// Default archiver: records the request and discards the history.
#[derive(Debug, Default)]
pub struct LogArchiver;

#[async_trait]
impl Archiver for LogArchiver {
    async fn archive(&self, session: Session) -> Result<()> {
        tracing::info!(
            session_key = %session.key,
            messages = session.messages.len(),
            "archiving session history"
        );
        Ok(())
    }
}

/// Spawn a detached archival task; failure is observed via logs only.
pub fn spawn_archive(archiver: Arc<dyn Archiver>, session: Session) {
    tokio::spawn(async move {
        let key = session.key.clone();
        if let Err(err) = archiver.archive(session).await {
            tracing::warn!(session_key = %key, error = %err, "background archival failed");
        }
    });
}
